//! Payload types of the tutorial API and their declared schemas.
//!
//! Each type comes in two halves: a serde struct the handlers work with, and
//! a [`Model`] the binder validates against (and the router projects onto).

use serde::{Deserialize, Serialize};

use crate::model::{Field, Kind, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spice {
    Pepper,
    Salt,
    Maggi,
}

impl Spice {
    pub const MEMBERS: &'static [&'static str] = &["pepper", "salt", "maggi"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pepper => "pepper",
            Self::Salt => "salt",
            Self::Maggi => "maggi",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub tax: Option<f64>,
}

impl Item {
    pub const MARKER: &'static str = " + happy!";

    pub fn schema() -> Model {
        Model::new("Item")
            .field(Field::new("name", Kind::Str))
            .field(Field::new("description", Kind::Str).optional())
            .field(Field::new("price", Kind::Float))
            .field(Field::new("tax", Kind::Float).optional())
    }

    /// Appends [`Item::MARKER`] unless the name already ends with it.
    pub fn mark_happy(&mut self) {
        if !self.name.ends_with(Self::MARKER) {
            self.name.push_str(Self::MARKER);
        }
    }

    /// Price including tax. A missing tax counts as zero.
    pub fn brutto(&self) -> f64 {
        self.price + self.tax.unwrap_or(0.0)
    }
}

/// An [`Item`] together with its computed gross price.
#[derive(Debug, Serialize)]
pub struct PricedItem {
    #[serde(flatten)]
    pub item: Item,
    pub brutto: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: Option<String>,
}

impl User {
    pub fn schema() -> Model {
        Model::new("User")
            .field(Field::new("username", Kind::Str))
            .field(Field::new("full_name", Kind::Str).optional())
    }
}

/// Registration payload: a [`User`] plus credentials that must never be echoed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIn {
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
    pub age: Option<i64>,
}

impl UserIn {
    pub fn schema() -> Model {
        User::schema()
            .extend("UserIn")
            .field(Field::new("password", Kind::Str))
            .field(Field::new("age", Kind::Int).optional())
    }
}

/// What the API reports back about a user.
pub fn user_out_schema() -> Model {
    User::schema().extend("UserOut")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub name: String,
}

impl Image {
    pub fn schema() -> Model {
        Model::new("Image")
            .field(Field::new("url", Kind::Url))
            .field(Field::new("name", Kind::Str))
    }
}
