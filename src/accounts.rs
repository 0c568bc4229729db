//! Account routes: registration, login, logout, and the account update
//! form, mounted under `/account`. Also home of the request guard that
//! turns a `LoginToken` cookie into the authenticated user.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use rocket::{
    fairing::{self, Fairing, Info, Kind},
    form::Form,
    http::{Cookie, CookieJar, Status},
    request::{FromRequest, Outcome},
    response::{Flash, Redirect},
    Build, Request, Rocket, State,
};
use sea_orm::DatabaseConnection;

use crate::{
    database::{self, entities::user},
    error::Error,
    forms::{self, AccountInput, RegistrationInput},
    templates::{FormResponse, PageRenderer, Webpage},
};

const TOKEN_COOKIE: &str = "LoginToken";

pub struct Accounts {}

impl Accounts {
    pub(crate) fn fairing() -> Self {
        Self {}
    }
}

#[rocket::async_trait]
impl Fairing for Accounts {
    fn info(&self) -> Info {
        Info {
            name: "Accounts",
            kind: Kind::Ignite | Kind::Singleton,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        Ok(rocket
            .mount(
                "/account",
                routes![
                    account_get,
                    account_post,
                    register_get,
                    register_post,
                    login_get,
                    login_post,
                    logout
                ],
            )
            .register("/", catchers![unauthorized]))
    }
}

#[catch(401)]
fn unauthorized() -> Redirect {
    Redirect::to(uri!("/account", login_get))
}

#[derive(FromForm)]
struct RegisterSubmission<'r> {
    username: &'r str,
    email: &'r str,
    first_name: &'r str,
    last_name: &'r str,
    password1: &'r str,
    password2: &'r str,
}

impl RegisterSubmission<'_> {
    fn input(&self) -> RegistrationInput {
        RegistrationInput {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            // Passwords are taken verbatim.
            password1: self.password1.to_string(),
            password2: self.password2.to_string(),
        }
    }
}

#[derive(FromForm)]
struct LoginForm<'r> {
    email: &'r str,
    password: &'r str,
}

#[derive(FromForm)]
struct AccountSubmission<'r> {
    first_name: &'r str,
    last_name: &'r str,
    email: &'r str,
    password1: &'r str,
    password2: &'r str,
}

impl AccountSubmission<'_> {
    fn input(&self, user: &user::Model) -> AccountInput {
        AccountInput {
            username: user.username.clone(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password1: self.password1.to_string(),
            password2: self.password2.to_string(),
        }
    }
}

#[get("/")]
async fn account_get(user: user::Model, mut renderer: PageRenderer<'_>) -> Result<Webpage, Error> {
    renderer.account(&AccountInput::from(&user), None).await
}

#[post("/", data = "<form>")]
async fn account_post(
    user: user::Model,
    form: Form<AccountSubmission<'_>>,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let input = form.input(&user);
    let email_taken = database::email_taken(db, &input.email).await?;

    match forms::validate_account_update(&input, &user.email, email_taken) {
        Ok(changes) => {
            database::update_user(db, user, &changes).await?;
            Ok(FormResponse::Notice(Flash::success(
                Redirect::to(uri!("/account", account_get)),
                "Account updated.",
            )))
        }
        Err(errors) => {
            let page = renderer.account(&input, Some(&errors)).await?;
            Ok(FormResponse::Page(page))
        }
    }
}

#[get("/register")]
async fn register_get(mut renderer: PageRenderer<'_>) -> Result<Webpage, Error> {
    renderer.register(&RegistrationInput::default(), None).await
}

#[post("/register", data = "<form>")]
async fn register_post(
    form: Form<RegisterSubmission<'_>>,
    db: &State<DatabaseConnection>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let input = form.input();
    let email_taken = database::email_taken(db, &input.email).await?;
    let username_taken = database::username_taken(db, &input.username).await?;

    match forms::validate_registration(&input, email_taken, username_taken) {
        Ok(registration) => {
            database::create_user(db, &registration).await?;
            Ok(FormResponse::Notice(Flash::success(
                Redirect::to(uri!("/account", login_get)),
                "Account created. You can log in now.",
            )))
        }
        Err(errors) => {
            let page = renderer.register(&input, Some(&errors)).await?;
            Ok(FormResponse::Page(page))
        }
    }
}

#[get("/login")]
async fn login_get(mut renderer: PageRenderer<'_>) -> Result<Webpage, Error> {
    renderer.login(false).await
}

#[post("/login", data = "<form>")]
async fn login_post(
    form: Form<LoginForm<'_>>,
    db: &State<DatabaseConnection>,
    cookies: &CookieJar<'_>,
    mut renderer: PageRenderer<'_>,
) -> Result<FormResponse, Error> {
    let Some(user) = database::get_user_by_email(db, form.email).await? else {
        return Ok(FormResponse::Page(renderer.login(true).await?));
    };

    let argon2 = Argon2::default();
    let stored = PasswordHash::new(&user.password_hash)?;
    if argon2
        .verify_password(form.password.as_bytes(), &stored)
        .is_ok()
    {
        let session = database::create_token(db, user.id).await?;
        cookies.add(Cookie::build((TOKEN_COOKIE, session.token)));
        Ok(FormResponse::Redirect(Redirect::to(uri!("/"))))
    } else {
        Ok(FormResponse::Page(renderer.login(true).await?))
    }
}

#[get("/logout")]
async fn logout(
    cookies: &CookieJar<'_>,
    db: &State<DatabaseConnection>,
) -> Result<Redirect, Error> {
    if let Some(cookie) = cookies.get(TOKEN_COOKIE) {
        database::delete_token(db, cookie.value()).await?;
    }
    cookies.remove(TOKEN_COOKIE);
    Ok(Redirect::to(uri!("/account", login_get)))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for user::Model {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(cookie) = req.cookies().get(TOKEN_COOKIE) else {
            return Outcome::Error((Status::Unauthorized, Error::NotLoggedIn));
        };
        let Some(db) = req.rocket().state::<DatabaseConnection>() else {
            return Outcome::Error((Status::InternalServerError, Error::DatabaseNotFound));
        };

        match database::get_user_by_token(db, cookie.value()).await {
            Ok(Some(user)) => Outcome::Success(user),
            Ok(None) => Outcome::Error((Status::Unauthorized, Error::NotLoggedIn)),
            Err(e) => Outcome::Error((Status::InternalServerError, e)),
        }
    }
}
