//! Contact CRUD handlers. Every route requires an authenticated user; the
//! target record must additionally be visible and owned by the caller, or
//! the handler answers as if it did not exist.

use std::path::Path;

use rand::{distributions::Alphanumeric, Rng};
use rocket::{
    form::Form,
    fs::TempFile,
    http::ContentType,
    response::{Flash, Redirect},
    tokio::fs,
    State,
};
use sea_orm::DatabaseConnection;

use crate::{
    database::{self, entities::user},
    error::Error,
    forms::{self, ContactInput, Rule},
    templates::{FormResponse, PageRenderer, Webpage},
    AppConfig,
};

#[derive(FromForm)]
pub struct ContactSubmission<'r> {
    first_name: &'r str,
    last_name: &'r str,
    phone: &'r str,
    email: &'r str,
    description: &'r str,
    category: Option<i32>,
    picture: Option<TempFile<'r>>,
}

impl ContactSubmission<'_> {
    fn input(&self) -> ContactInput {
        ContactInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
        }
    }
}

fn picture_is_image(picture: Option<&TempFile<'_>>) -> bool {
    match picture {
        Some(file) if file.len() > 0 => file
            .content_type()
            .map_or(false, |content_type| content_type.top() == "image"),
        _ => true,
    }
}

async fn store_picture(
    picture: Option<&mut TempFile<'_>>,
    dir: &Path,
) -> Result<Option<String>, Error> {
    let Some(file) = picture else {
        return Ok(None);
    };
    if file.len() == 0 {
        return Ok(None);
    }

    let extension = file
        .content_type()
        .and_then(ContentType::extension)
        .map_or_else(|| "bin".to_string(), |e| e.to_string());
    let stem: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    let name = format!("{stem}.{extension}");

    fs::create_dir_all(dir).await.map_err(Error::PictureStore)?;
    file.copy_to(dir.join(&name))
        .await
        .map_err(Error::PictureStore)?;

    Ok(Some(name))
}

#[get("/")]
pub async fn index(
    user: user::Model,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<Webpage, Error> {
    let contacts = database::list_contacts_for_owner(db, user.id).await?;
    renderer.index(contacts).await
}

#[get("/contact/new")]
pub async fn create_get(
    _user: user::Model,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<Webpage, Error> {
    let categories = database::list_categories(db).await?;
    renderer
        .contact_form(
            uri!(create_post).to_string(),
            categories,
            &ContactInput::default(),
            None,
        )
        .await
}

#[post("/contact/new", data = "<form>")]
pub async fn create_post(
    user: user::Model,
    mut form: Form<ContactSubmission<'_>>,
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let input = form.input();

    match (forms::validate_contact(&input), picture_is_image(form.picture.as_ref())) {
        (Ok(validated), true) => {
            let picture = store_picture(form.picture.as_mut(), &config.upload_dir).await?;
            let contact = database::insert_contact(db, user.id, &validated, picture).await?;
            Ok(FormResponse::Redirect(Redirect::to(uri!(update_get(
                contact.id
            )))))
        }
        (result, picture_ok) => {
            let mut errors = result.err().unwrap_or_default();
            if !picture_ok {
                errors.push("picture", Rule::InvalidFormat, "The picture must be an image file.");
            }
            let categories = database::list_categories(db).await?;
            let page = renderer
                .contact_form(uri!(create_post).to_string(), categories, &input, Some(&errors))
                .await?;
            Ok(FormResponse::Page(page))
        }
    }
}

#[get("/contact/<id>/edit")]
pub async fn update_get(
    id: i32,
    user: user::Model,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<Webpage, Error> {
    let contact = database::find_contact_for_owner(db, id, user.id)
        .await?
        .ok_or(Error::ContactNotFound)?;
    let categories = database::list_categories(db).await?;
    renderer
        .contact_form(
            uri!(update_post(id)).to_string(),
            categories,
            &ContactInput::from(&contact),
            None,
        )
        .await
}

#[post("/contact/<id>/edit", data = "<form>")]
pub async fn update_post(
    id: i32,
    user: user::Model,
    mut form: Form<ContactSubmission<'_>>,
    db: &State<DatabaseConnection>,
    config: &State<AppConfig>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let existing = database::find_contact_for_owner(db, id, user.id)
        .await?
        .ok_or(Error::ContactNotFound)?;
    let input = form.input();

    match (forms::validate_contact(&input), picture_is_image(form.picture.as_ref())) {
        (Ok(validated), true) => {
            let picture = store_picture(form.picture.as_mut(), &config.upload_dir).await?;
            database::update_contact(db, existing, &validated, picture).await?;
            Ok(FormResponse::Notice(Flash::success(
                Redirect::to(uri!(update_get(id))),
                "Contact saved.",
            )))
        }
        (result, picture_ok) => {
            let mut errors = result.err().unwrap_or_default();
            if !picture_ok {
                errors.push("picture", Rule::InvalidFormat, "The picture must be an image file.");
            }
            let categories = database::list_categories(db).await?;
            let page = renderer
                .contact_form(uri!(update_post(id)).to_string(), categories, &input, Some(&errors))
                .await?;
            Ok(FormResponse::Page(page))
        }
    }
}

#[derive(FromForm)]
pub struct DeleteForm<'r> {
    #[field(default = "no")]
    confirmation: &'r str,
}

#[post("/contact/<id>/delete", data = "<form>")]
pub async fn delete(
    id: i32,
    user: user::Model,
    form: Form<DeleteForm<'_>>,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let contact = database::find_contact_for_owner(db, id, user.id)
        .await?
        .ok_or(Error::ContactNotFound)?;

    if form.confirmation == "yes" {
        database::delete_contact(db, contact).await?;
        Ok(FormResponse::Notice(Flash::success(
            Redirect::to(uri!(index)),
            "Contact deleted.",
        )))
    } else {
        renderer.notice("warning", "Careful! You are about to delete this record.");
        let page = renderer.contact_confirm(&contact).await?;
        Ok(FormResponse::Page(page))
    }
}
