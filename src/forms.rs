//! Validation of submitted form data.
//!
//! Every function here is pure: raw field values go in, either a validated
//! value or the full set of field-tagged errors comes out. Nothing is
//! persisted and nothing short-circuits; a page can therefore show every
//! problem with a submission at once. Facts that depend on the database
//! (is this email already taken?) are looked up by the handler and passed
//! in as plain booleans.

use std::collections::BTreeMap;

use email_address::EmailAddress;
use serde::Serialize;

use crate::database::entities::{contact, user};

const REQUIRED: &str = "This field is required.";
const NAME_FORMAT: &str =
    "A name cannot include digits (0-9) or special characters (!#%&?).";
const EMAIL_FORMAT: &str = "Enter a valid e-mail address.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Rule {
    Required,
    InvalidFormat,
    InvalidLength,
    Conflict,
    Mismatch,
    WeakCredential,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: Rule,
    pub message: String,
}

/// Ordered collection of validation failures, in the order the checks ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, field: &'static str, rule: Rule, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            rule,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages grouped per field, for the template context.
    pub fn by_field(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut map: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for error in &self.0 {
            map.entry(error.field).or_default().push(error.message.clone());
        }
        map
    }
}

fn require(errors: &mut FieldErrors, field: &'static str, value: &str) -> bool {
    if value.is_empty() {
        errors.push(field, Rule::Required, REQUIRED);
        false
    } else {
        true
    }
}

fn alphabetic(value: &str) -> bool {
    value.chars().all(char::is_alphabetic)
}

fn valid_email(value: &str) -> bool {
    value.parse::<EmailAddress>().is_ok()
}

/// Contact form fields as submitted, after whitespace trimming.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub category: Option<i32>,
}

impl From<&contact::Model> for ContactInput {
    fn from(model: &contact::Model) -> Self {
        Self {
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            phone: model.phone.clone(),
            email: model.email.clone(),
            description: model.description.clone(),
            category: Some(model.category_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub category_id: i32,
}

/// Field-level checks run first, one per field; the cross-field name
/// equality check runs last and may add a second error to `last_name`.
pub fn validate_contact(input: &ContactInput) -> Result<ValidatedContact, FieldErrors> {
    let mut errors = FieldErrors::default();

    if require(&mut errors, "first_name", &input.first_name) && !alphabetic(&input.first_name) {
        errors.push("first_name", Rule::InvalidFormat, NAME_FORMAT);
    }
    if require(&mut errors, "last_name", &input.last_name) && !alphabetic(&input.last_name) {
        errors.push("last_name", Rule::InvalidFormat, NAME_FORMAT);
    }
    if require(&mut errors, "phone", &input.phone) {
        if !input.phone.chars().all(|c| c.is_ascii_digit()) {
            errors.push("phone", Rule::InvalidFormat, "A phone number can only contain digits.");
        } else if !(10..=11).contains(&input.phone.len()) {
            errors.push(
                "phone",
                Rule::InvalidLength,
                "A phone number cannot have fewer than 10 or more than 11 digits. \
                 Use the area code followed by the number.",
            );
        }
    }
    if require(&mut errors, "email", &input.email) && !valid_email(&input.email) {
        errors.push("email", Rule::InvalidFormat, EMAIL_FORMAT);
    }
    require(&mut errors, "description", &input.description);
    if input.category.is_none() {
        errors.push("category", Rule::Required, REQUIRED);
    }

    if !input.first_name.is_empty() && input.first_name == input.last_name {
        errors.push(
            "last_name",
            Rule::InvalidFormat,
            "The last name cannot be the same as the first name.",
        );
    }

    match (errors.is_empty(), input.category) {
        (true, Some(category_id)) => Ok(ValidatedContact {
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            description: input.description.clone(),
            category_id,
        }),
        _ => Err(errors),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

pub fn validate_registration(
    input: &RegistrationInput,
    email_taken: bool,
    username_taken: bool,
) -> Result<ValidatedRegistration, FieldErrors> {
    let mut errors = FieldErrors::default();

    if require(&mut errors, "username", &input.username) && username_taken {
        errors.push("username", Rule::Conflict, "That username is already taken.");
    }
    if require(&mut errors, "email", &input.email) {
        if !valid_email(&input.email) {
            errors.push("email", Rule::InvalidFormat, EMAIL_FORMAT);
        } else if email_taken {
            errors.push("email", Rule::Conflict, "That e-mail address is already registered.");
        }
    }
    if require(&mut errors, "first_name", &input.first_name) && input.first_name.chars().count() < 3
    {
        errors.push("first_name", Rule::InvalidLength, "Please use at least 3 letters.");
    }
    if !input.last_name.is_empty() && input.last_name.chars().count() < 3 {
        errors.push("last_name", Rule::InvalidLength, "Please use at least 3 letters.");
    }

    let has_first = require(&mut errors, "password1", &input.password1);
    let has_second = require(&mut errors, "password2", &input.password2);
    if has_first && has_second && input.password1 != input.password2 {
        errors.push("password2", Rule::Mismatch, "The passwords do not match.");
    }
    if has_first {
        for message in password_strength(&input.password1, &input.username, &input.email) {
            errors.push("password1", Rule::WeakCredential, message);
        }
    }

    if errors.is_empty() {
        Ok(ValidatedRegistration {
            username: input.username.clone(),
            email: input.email.clone(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            password: input.password1.clone(),
        })
    } else {
        Err(errors)
    }
}

/// Account update fields. `username` is not editable; it is carried along
/// from the authenticated account for the credential similarity check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccountInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl From<&user::Model> for AccountInput {
    fn from(model: &user::Model) -> Self {
        Self {
            username: model.username.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            email: model.email.clone(),
            password1: String::new(),
            password2: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `None` leaves the stored credential untouched.
    pub new_password: Option<String>,
}

/// `email_taken` reports whether any account holds the submitted address;
/// resubmitting the account's own address (any letter-casing) is not a
/// conflict, so it is compared against `current_email` case-insensitively.
pub fn validate_account_update(
    input: &AccountInput,
    current_email: &str,
    email_taken: bool,
) -> Result<AccountChanges, FieldErrors> {
    let mut errors = FieldErrors::default();

    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if require(&mut errors, field, value) && !(2..=30).contains(&value.chars().count()) {
            errors.push(field, Rule::InvalidLength, "Please use between 2 and 30 letters.");
        }
    }
    if require(&mut errors, "email", &input.email) {
        if !valid_email(&input.email) {
            errors.push("email", Rule::InvalidFormat, EMAIL_FORMAT);
        } else if email_taken && current_email.to_lowercase() != input.email.to_lowercase() {
            errors.push(
                "email",
                Rule::Conflict,
                "Another account already uses that e-mail address.",
            );
        }
    }

    let new_password = if input.password1.is_empty() && input.password2.is_empty() {
        None
    } else {
        if input.password1 != input.password2 {
            errors.push("password2", Rule::Mismatch, "The passwords do not match.");
        }
        if !input.password1.is_empty() {
            for message in password_strength(&input.password1, &input.username, &input.email) {
                errors.push("password1", Rule::WeakCredential, message);
            }
        }
        Some(input.password1.clone())
    };

    if errors.is_empty() {
        Ok(AccountChanges {
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            new_password,
        })
    } else {
        Err(errors)
    }
}

/// Password strength rules, one message per violated rule.
pub fn password_strength(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if password.chars().count() < 8 {
        messages
            .push("This password is too short. It must contain at least 8 characters.".to_string());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        messages.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    let local_part = email.split('@').next().unwrap_or_default();
    for attribute in [username, local_part] {
        if attribute.chars().count() >= 3 && lowered.contains(&attribute.to_lowercase()) {
            messages.push("The password is too similar to your other account details.".to_string());
            break;
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactInput {
        ContactInput {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            phone: "5551234567".into(),
            email: "ana@example.com".into(),
            description: "met at the conference".into(),
            category: Some(1),
        }
    }

    fn fields(errors: &FieldErrors) -> Vec<(&'static str, Rule)> {
        errors.iter().map(|e| (e.field, e.rule)).collect()
    }

    #[test]
    fn valid_contact_passes() {
        let validated = validate_contact(&contact()).expect("valid input");
        assert_eq!(validated.category_id, 1);
        assert_eq!(validated.phone, "5551234567");
    }

    #[test]
    fn equal_names_fail_on_last_name() {
        let mut input = contact();
        input.last_name = "Ana".into();
        let errors = validate_contact(&input).unwrap_err();
        assert_eq!(fields(&errors), vec![("last_name", Rule::InvalidFormat)]);
    }

    #[test]
    fn name_equality_is_case_sensitive() {
        let mut input = contact();
        input.last_name = "ana".into();
        assert!(validate_contact(&input).is_ok());
    }

    #[test]
    fn equality_error_comes_after_field_level_errors() {
        let mut input = contact();
        input.first_name = "Ana".into();
        input.last_name = "Ana".into();
        input.phone = "555".into();
        let errors = validate_contact(&input).unwrap_err();
        let last = errors.iter().last().expect("errors present");
        assert_eq!(last.field, "last_name");
        assert!(errors.iter().any(|e| e.field == "phone"));
    }

    #[test]
    fn names_with_digits_or_symbols_fail() {
        for bad in ["Ana4", "S!lva", "Ana Maria", "a-b"] {
            let mut input = contact();
            input.first_name = bad.into();
            let errors = validate_contact(&input).unwrap_err();
            assert_eq!(fields(&errors), vec![("first_name", Rule::InvalidFormat)], "{bad}");

            let mut input = contact();
            input.last_name = bad.into();
            let errors = validate_contact(&input).unwrap_err();
            assert_eq!(fields(&errors), vec![("last_name", Rule::InvalidFormat)], "{bad}");
        }
    }

    #[test]
    fn accented_names_are_alphabetic() {
        let mut input = contact();
        input.first_name = "José".into();
        input.last_name = "Conceição".into();
        assert!(validate_contact(&input).is_ok());
    }

    #[test]
    fn phone_length_bounds() {
        let cases = [
            ("555123456", false),
            ("5551234567", true),
            ("55512345678", true),
            ("555123456789", false),
        ];
        for (phone, ok) in cases {
            let mut input = contact();
            input.phone = phone.into();
            let result = validate_contact(&input);
            assert_eq!(result.is_ok(), ok, "{phone}");
            if !ok {
                assert_eq!(
                    fields(&result.unwrap_err()),
                    vec![("phone", Rule::InvalidLength)],
                    "{phone}"
                );
            }
        }
    }

    #[test]
    fn phone_with_letters_fails_on_format() {
        let mut input = contact();
        input.phone = "55512345ab".into();
        let errors = validate_contact(&input).unwrap_err();
        assert_eq!(fields(&errors), vec![("phone", Rule::InvalidFormat)]);
    }

    #[test]
    fn invalid_email_fails() {
        let mut input = contact();
        input.email = "not-an-address".into();
        let errors = validate_contact(&input).unwrap_err();
        assert_eq!(fields(&errors), vec![("email", Rule::InvalidFormat)]);
    }

    #[test]
    fn empty_submission_collects_every_required_error() {
        let errors = validate_contact(&ContactInput::default()).unwrap_err();
        let required: Vec<_> = errors.iter().filter(|e| e.rule == Rule::Required).collect();
        assert_eq!(required.len(), 6);
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut input = contact();
        input.first_name = "Ana4".into();
        input.phone = "12".into();
        input.email = "nope".into();
        let errors = validate_contact(&input).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                ("first_name", Rule::InvalidFormat),
                ("phone", Rule::InvalidLength),
                ("email", Rule::InvalidFormat),
            ]
        );
    }

    fn registration() -> RegistrationInput {
        RegistrationInput {
            username: "anasilva".into(),
            email: "ana@example.com".into(),
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            password1: "green-bicycle-42".into(),
            password2: "green-bicycle-42".into(),
        }
    }

    #[test]
    fn registration_accepts_novel_email() {
        assert!(validate_registration(&registration(), false, false).is_ok());
    }

    #[test]
    fn registration_rejects_taken_email() {
        let errors = validate_registration(&registration(), true, false).unwrap_err();
        assert_eq!(fields(&errors), vec![("email", Rule::Conflict)]);
    }

    #[test]
    fn registration_rejects_taken_username() {
        let errors = validate_registration(&registration(), false, true).unwrap_err();
        assert_eq!(fields(&errors), vec![("username", Rule::Conflict)]);
    }

    #[test]
    fn registration_first_name_minimum_length() {
        let mut input = registration();
        input.first_name = "An".into();
        let errors = validate_registration(&input, false, false).unwrap_err();
        assert_eq!(fields(&errors), vec![("first_name", Rule::InvalidLength)]);
    }

    #[test]
    fn registration_last_name_is_optional_but_bounded() {
        let mut input = registration();
        input.last_name = String::new();
        assert!(validate_registration(&input, false, false).is_ok());

        input.last_name = "Si".into();
        let errors = validate_registration(&input, false, false).unwrap_err();
        assert_eq!(fields(&errors), vec![("last_name", Rule::InvalidLength)]);
    }

    #[test]
    fn registration_password_mismatch() {
        let mut input = registration();
        input.password2 = "something-else-9".into();
        let errors = validate_registration(&input, false, false).unwrap_err();
        assert_eq!(fields(&errors), vec![("password2", Rule::Mismatch)]);
    }

    #[test]
    fn registration_weak_password_reports_each_rule() {
        let mut input = registration();
        input.password1 = "1234".into();
        input.password2 = "1234".into();
        let errors = validate_registration(&input, false, false).unwrap_err();
        let messages: Vec<_> = errors
            .iter()
            .filter(|e| e.rule == Rule::WeakCredential)
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("too short"));
        assert!(messages[1].contains("entirely numeric"));
    }

    #[test]
    fn password_similar_to_username_is_weak() {
        let messages = password_strength("anasilva2024", "anasilva", "ana@example.com");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("too similar"));
    }

    #[test]
    fn password_similar_to_email_local_part_is_weak() {
        let messages = password_strength("my.ana.word", "someone", "ana@example.com");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn strong_password_has_no_messages() {
        assert!(password_strength("green-bicycle-42", "anasilva", "ana@example.com").is_empty());
    }

    fn account() -> AccountInput {
        AccountInput {
            username: "anasilva".into(),
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            email: "ana@example.com".into(),
            password1: String::new(),
            password2: String::new(),
        }
    }

    #[test]
    fn update_own_email_recased_is_not_a_conflict() {
        let mut input = account();
        input.email = "ANA@Example.com".into();
        let changes =
            validate_account_update(&input, "ana@example.com", true).expect("own address");
        assert_eq!(changes.email, "ANA@Example.com");
        assert_eq!(changes.new_password, None);
    }

    #[test]
    fn update_rejects_another_accounts_email() {
        let mut input = account();
        input.email = "bruno@example.com".into();
        let errors = validate_account_update(&input, "ana@example.com", true).unwrap_err();
        assert_eq!(fields(&errors), vec![("email", Rule::Conflict)]);
    }

    #[test]
    fn update_name_length_bounds() {
        let mut input = account();
        input.first_name = "A".into();
        let errors = validate_account_update(&input, "ana@example.com", false).unwrap_err();
        assert_eq!(fields(&errors), vec![("first_name", Rule::InvalidLength)]);

        let mut input = account();
        input.last_name = "S".repeat(31);
        let errors = validate_account_update(&input, "ana@example.com", false).unwrap_err();
        assert_eq!(fields(&errors), vec![("last_name", Rule::InvalidLength)]);
    }

    #[test]
    fn update_without_passwords_keeps_credential() {
        let changes =
            validate_account_update(&account(), "ana@example.com", false).expect("no-op password");
        assert_eq!(changes.new_password, None);
    }

    #[test]
    fn update_with_one_password_field_is_a_mismatch() {
        let mut input = account();
        input.password1 = "green-bicycle-42".into();
        let errors = validate_account_update(&input, "ana@example.com", false).unwrap_err();
        assert_eq!(fields(&errors), vec![("password2", Rule::Mismatch)]);

        let mut input = account();
        input.password2 = "green-bicycle-42".into();
        let errors = validate_account_update(&input, "ana@example.com", false).unwrap_err();
        assert_eq!(fields(&errors), vec![("password2", Rule::Mismatch)]);
    }

    #[test]
    fn update_with_weak_password_carries_rule_messages() {
        let mut input = account();
        input.password1 = "123".into();
        input.password2 = "123".into();
        let errors = validate_account_update(&input, "ana@example.com", false).unwrap_err();
        assert!(errors.iter().all(|e| e.field == "password1"));
        assert!(errors.iter().any(|e| e.rule == Rule::WeakCredential));
    }

    #[test]
    fn update_with_matching_strong_password_replaces_credential() {
        let mut input = account();
        input.password1 = "green-bicycle-42".into();
        input.password2 = "green-bicycle-42".into();
        let changes = validate_account_update(&input, "ana@example.com", false).expect("valid");
        assert_eq!(changes.new_password.as_deref(), Some("green-bicycle-42"));
    }

    #[test]
    fn errors_group_by_field() {
        let mut input = contact();
        input.first_name = "Ana4".into();
        input.last_name = "Ana4".into();
        let errors = validate_contact(&input).unwrap_err();
        let map = errors.by_field();
        assert_eq!(map.get("first_name").map(Vec::len), Some(1));
        assert_eq!(map.get("last_name").map(Vec::len), Some(2));
    }
}
