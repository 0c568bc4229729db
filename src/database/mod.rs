//! Query layer over the relational store. Handlers only ever touch the
//! database through these functions, which cover exactly: find-by-id scoped
//! to owner and visibility, list-for-owner, insert, update, delete,
//! exists-by-field, and the session bookkeeping for login tokens.

use std::ops::Add;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chrono::{Days, Duration, Local};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder,
};

use self::entities::prelude::*;

use crate::error::Error;
use crate::forms::{AccountChanges, ValidatedContact, ValidatedRegistration};

use self::entities::{active_session, category, contact, user};

pub mod entities;
pub mod fairing;

/// The record is only returned when it is visible and owned by `owner_id`;
/// anyone else gets `None`, indistinguishable from a missing record.
pub async fn find_contact_for_owner(
    db: &DatabaseConnection,
    contact_id: i32,
    owner_id: i32,
) -> Result<Option<contact::Model>, Error> {
    Contact::find_by_id(contact_id)
        .filter(contact::Column::Show.eq(true))
        .filter(contact::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Error::Database)
}

pub async fn list_contacts_for_owner(
    db: &DatabaseConnection,
    owner_id: i32,
) -> Result<Vec<contact::Model>, Error> {
    Contact::find()
        .filter(contact::Column::OwnerId.eq(owner_id))
        .filter(contact::Column::Show.eq(true))
        .order_by_desc(contact::Column::Id)
        .all(db)
        .await
        .map_err(Error::Database)
}

pub async fn insert_contact(
    db: &DatabaseConnection,
    owner_id: i32,
    validated: &ValidatedContact,
    picture: Option<String>,
) -> Result<contact::Model, Error> {
    contact::ActiveModel {
        first_name: ActiveValue::Set(validated.first_name.clone()),
        last_name: ActiveValue::Set(validated.last_name.clone()),
        phone: ActiveValue::Set(validated.phone.clone()),
        email: ActiveValue::Set(validated.email.clone()),
        description: ActiveValue::Set(validated.description.clone()),
        category_id: ActiveValue::Set(validated.category_id),
        picture: ActiveValue::Set(picture),
        show: ActiveValue::Set(true),
        owner_id: ActiveValue::Set(owner_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::Database)
}

/// A fresh picture replaces the stored one; `None` keeps it.
pub async fn update_contact(
    db: &DatabaseConnection,
    existing: contact::Model,
    validated: &ValidatedContact,
    picture: Option<String>,
) -> Result<contact::Model, Error> {
    let mut model = contact::ActiveModel {
        id: ActiveValue::Unchanged(existing.id),
        first_name: ActiveValue::Set(validated.first_name.clone()),
        last_name: ActiveValue::Set(validated.last_name.clone()),
        phone: ActiveValue::Set(validated.phone.clone()),
        email: ActiveValue::Set(validated.email.clone()),
        description: ActiveValue::Set(validated.description.clone()),
        category_id: ActiveValue::Set(validated.category_id),
        ..Default::default()
    };
    if picture.is_some() {
        model.picture = ActiveValue::Set(picture);
    }
    model.update(db).await.map_err(Error::Database)
}

pub async fn delete_contact(db: &DatabaseConnection, contact: contact::Model) -> Result<(), Error> {
    contact.delete(db).await?;
    Ok(())
}

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>, Error> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Error::Database)
}

pub async fn email_taken(db: &DatabaseConnection, email: &str) -> Result<bool, Error> {
    Ok(User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
        .is_some())
}

pub async fn username_taken(db: &DatabaseConnection, username: &str) -> Result<bool, Error> {
    Ok(User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .is_some())
}

pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, Error> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Error::Database)
}

fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub async fn create_user(
    db: &DatabaseConnection,
    registration: &ValidatedRegistration,
) -> Result<user::Model, Error> {
    let password_hash = hash_password(&registration.password)?;

    user::ActiveModel {
        username: ActiveValue::Set(registration.username.clone()),
        email: ActiveValue::Set(registration.email.clone()),
        first_name: ActiveValue::Set(registration.first_name.clone()),
        last_name: ActiveValue::Set(registration.last_name.clone()),
        password_hash: ActiveValue::Set(password_hash),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::Database)
}

pub async fn update_user(
    db: &DatabaseConnection,
    user: user::Model,
    changes: &AccountChanges,
) -> Result<user::Model, Error> {
    let mut model = user::ActiveModel {
        id: ActiveValue::Unchanged(user.id),
        first_name: ActiveValue::Set(changes.first_name.clone()),
        last_name: ActiveValue::Set(changes.last_name.clone()),
        email: ActiveValue::Set(changes.email.clone()),
        ..Default::default()
    };
    if let Some(password) = &changes.new_password {
        model.password_hash = ActiveValue::Set(hash_password(password)?);
    }
    model.update(db).await.map_err(Error::Database)
}

/// A token past its idle or absolute timeout no longer identifies anyone.
pub async fn get_user_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<user::Model>, Error> {
    let Some(session) = ActiveSession::find()
        .filter(active_session::Column::Token.eq(token))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let now = Local::now().naive_local();
    if session.idle_timeout < now || session.absolute_timeout < now {
        return Ok(None);
    }

    User::find_by_id(session.user_id)
        .one(db)
        .await
        .map_err(Error::Database)
}

pub async fn create_token(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<active_session::Model, Error> {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    active_session::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        token: ActiveValue::Set(token),
        idle_timeout: ActiveValue::Set(Local::now().naive_local().add(Duration::hours(2))),
        absolute_timeout: ActiveValue::Set(Local::now().naive_local().add(Days::new(1))),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Error::Database)
}

pub async fn delete_token(db: &DatabaseConnection, token: &str) -> Result<(), Error> {
    ActiveSession::delete_many()
        .filter(active_session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(())
}
