use std::{convert::Into, env, fs, path::PathBuf};

use include_dir::{include_dir, Dir};
use rocket::{
    fairing::{self, Fairing, Info, Kind},
    http::Status,
    request::{self, FlashMessage, FromRequest, Outcome},
    response::{
        content::{RawCss, RawHtml},
        Flash, Redirect, Responder,
    },
    tokio::sync::RwLock,
    Build, Request, Rocket, State,
};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::{
    database::entities::{category, contact, user},
    error::Error,
    forms::{AccountInput, ContactInput, FieldErrors, RegistrationInput},
};

static TEMPLATE_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");
static STYLE: &str = include_str!("../webroot/style.css");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Could not read directory '{0}'. {1}")]
    FailedToReadDirectory(PathBuf, std::io::Error),
    #[error("Tera encountered an error. {0}")]
    TeraError(#[from] tera::Error),
    #[error("Failed to read file. {0}")]
    FileReadError(std::io::Error),
}

pub struct TemplateFairing;

impl TemplateFairing {
    pub fn fairing() -> Self {
        Self {}
    }
}

#[rocket::async_trait]
impl Fairing for TemplateFairing {
    fn info(&self) -> Info {
        Info {
            name: "Template",
            kind: Kind::Ignite | Kind::Singleton,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        let debug_mode = if let Ok(path) = env::var("TEMPLATE_DIR") {
            if let Ok(path) = PathBuf::try_from(&path) {
                Some(path)
            } else {
                error!("Could not load alternative templates. '{path}' is not a valid path.");
                return Err(rocket);
            }
        } else {
            None
        };

        let rocket = if debug_mode.is_some() {
            rocket.mount("/template", routes![refresh])
        } else {
            rocket
        };

        let templates = match Templates::new(debug_mode) {
            Ok(templates) => templates,
            Err(e) => {
                error!("Could not create page renderer. {e}");
                return Err(rocket);
            }
        };

        Ok(rocket.manage(templates))
    }
}

#[get("/refresh")]
async fn refresh(template: &State<Templates>) -> Result<(), Error> {
    template.refresh().await?;
    Ok(())
}

pub struct Webpage(RawHtml<String>);

impl From<String> for Webpage {
    fn from(value: String) -> Self {
        Self(RawHtml(value))
    }
}

impl<'r> Responder<'r, 'static> for Webpage {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        self.0.respond_to(request)
    }
}

/// What a form handler can answer with: the page again (possibly carrying
/// errors), a plain redirect, or a redirect with a flashed notice.
#[derive(Responder)]
pub enum FormResponse {
    Page(Webpage),
    Redirect(Redirect),
    Notice(Flash<Redirect>),
}

pub struct Templates {
    debug_mode: Option<PathBuf>,
    tera: RwLock<Tera>,
    style: RwLock<String>,
}

impl Templates {
    fn new(debug_mode: Option<PathBuf>) -> Result<Self, Error> {
        let tera = RwLock::new(load_templates(&debug_mode)?);
        let style = RwLock::new(load_styling(&debug_mode)?);

        Ok(Self {
            debug_mode,
            tera,
            style,
        })
    }

    async fn refresh(&self) -> Result<(), Error> {
        let mut tera = self.tera.write().await;
        *tera = load_templates(&self.debug_mode)?;

        let mut style = self.style.write().await;
        *style = load_styling(&self.debug_mode)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Notice<'a> {
    kind: &'a str,
    message: &'a str,
}

pub struct PageRenderer<'r> {
    templates: &'r Templates,
    context: Context,
}

impl<'r> PageRenderer<'r> {
    pub async fn style(&self) -> RawCss<String> {
        RawCss(self.templates.style.read().await.clone())
    }

    /// Puts a notice on the page being rendered, without a redirect.
    pub fn notice(&mut self, kind: &str, message: &str) {
        self.context.insert("notice", &Notice { kind, message });
    }

    async fn render(&self, template: &str) -> Result<Webpage, Error> {
        Ok(self
            .templates
            .tera
            .read()
            .await
            .render(template, &self.context)
            .map(Into::into)?)
    }

    pub async fn index(&mut self, contacts: Vec<contact::Model>) -> Result<Webpage, Error> {
        self.context.insert("contacts", &contacts);
        self.render("index").await
    }

    pub async fn contact_form(
        &mut self,
        action: String,
        categories: Vec<category::Model>,
        values: &ContactInput,
        errors: Option<&FieldErrors>,
    ) -> Result<Webpage, Error> {
        self.context.insert("form_action", &action);
        self.context.insert("categories", &categories);
        self.context.insert("values", values);
        self.context
            .insert("selected_category", &values.category.unwrap_or_default());
        self.context
            .insert("errors", &errors.unwrap_or(&FieldErrors::default()).by_field());
        self.render("contact_form").await
    }

    pub async fn contact_confirm(&mut self, contact: &contact::Model) -> Result<Webpage, Error> {
        self.context.insert("contact", contact);
        self.render("contact_confirm").await
    }

    pub async fn register(
        &mut self,
        values: &RegistrationInput,
        errors: Option<&FieldErrors>,
    ) -> Result<Webpage, Error> {
        self.context.insert("values", values);
        self.context
            .insert("errors", &errors.unwrap_or(&FieldErrors::default()).by_field());
        self.render("register").await
    }

    pub async fn login(&mut self, failed: bool) -> Result<Webpage, Error> {
        self.context.insert("login_failed", &failed);
        self.render("login").await
    }

    pub async fn account(
        &mut self,
        values: &AccountInput,
        errors: Option<&FieldErrors>,
    ) -> Result<Webpage, Error> {
        self.context.insert("values", values);
        self.context
            .insert("errors", &errors.unwrap_or(&FieldErrors::default()).by_field());
        self.render("account").await
    }
}

fn load_styling(debug_mode: &Option<PathBuf>) -> Result<String, Error> {
    if let Some(path) = debug_mode {
        Ok(fs::read_to_string(path.join("webroot/style.css"))
            .map_err(TemplateError::FileReadError)?)
    } else {
        Ok(STYLE.to_string())
    }
}

fn load_templates(debug_mode: &Option<PathBuf>) -> Result<Tera, Error> {
    let mut templates = Vec::new();
    if let Some(path) = debug_mode {
        let files = path
            .join("templates")
            .read_dir()
            .map_err(|e| TemplateError::FailedToReadDirectory(path.clone(), e))?
            .flatten();
        for file in files {
            if let Some(name) = file.path().file_stem() {
                let contents =
                    fs::read_to_string(file.path()).map_err(TemplateError::FileReadError)?;
                templates.push((name.to_string_lossy().to_string(), contents));
            }
        }
    } else {
        for file in TEMPLATE_DIR.files() {
            if let Some(filename) = file.path().file_stem() {
                let filename = filename.to_string_lossy();
                let template = String::from_utf8_lossy(file.contents());
                templates.push((filename.to_string(), template.to_string()));
            }
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)?;
    Ok(tera)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageRenderer<'r> {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let mut context = Context::default();
        if let Outcome::Success(user) = req.guard::<user::Model>().await {
            context.insert("user", &user);
        }
        if let Outcome::Success(flash) = req.guard::<FlashMessage<'_>>().await {
            context.insert(
                "notice",
                &Notice {
                    kind: flash.kind(),
                    message: flash.message(),
                },
            );
        }

        let guard = req.guard::<&State<Templates>>().await;
        let templates = match guard {
            Outcome::Success(templates) => templates,
            Outcome::Error(_) => {
                return Outcome::Error((Status::InternalServerError, Error::TemplateNotFound))
            }
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        Outcome::Success(PageRenderer { templates, context })
    }
}
