use serde::Deserialize;

/// Raw `POST /submit` body. Missing fields deserialize as empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub favourite_colour: String,
}
