//! The tutorial API: path and query parameters, enums, request bodies,
//! nested models, response filtering, cookies, and headers.
//!
//! [`router`] builds the complete route table. Handlers are plain async
//! functions over a [`Context`]; all parameter checking has already
//! happened by the time they run.

use serde_json::{Value, json};

use crate::binder::ParamSpec;
use crate::context::Context;
use crate::error::{ApiError, RouteError};
use crate::middleware::LoggerMiddleware;
use crate::model::{Constrain, Kind};
use crate::router::{Endpoint, Router};

pub mod models;

use models::{Image, Item, PricedItem, Spice, User, UserIn, user_out_schema};

/// Builds the tutorial route table, wrapped in request logging.
///
/// # Errors
///
/// Fails only if a declaration below is inconsistent; see [`RouteError`].
pub fn router() -> Result<Router, RouteError> {
    let mut router = Router::new();
    router.layer(LoggerMiddleware);

    // Path and query parameters.
    router.add(Endpoint::get("/"), root)?;
    router.add(
        Endpoint::get("/names/name/prz")
            .param(ParamSpec::cookie("ads_id", Kind::Str).optional())
            .param(ParamSpec::header("user_agent", Kind::Str).optional())
            .param(ParamSpec::header("x_token", Kind::list(Kind::Str)).optional()),
        read_prz,
    )?;
    router.add(
        Endpoint::get("/names/name/{name}").param(ParamSpec::path("name", Kind::Str)),
        read_name,
    )?;
    router.add(
        Endpoint::get("/names/age/{age}").param(ParamSpec::path("age", Kind::Int)),
        read_age,
    )?;
    router.add(
        Endpoint::get("/spice/{spice}").param(ParamSpec::path("spice", Kind::Enum(Spice::MEMBERS))),
        get_spice,
    )?;
    router.add(
        Endpoint::get("/get-query-params")
            .param(ParamSpec::query("mandatory", Kind::Str))
            .param(ParamSpec::query("flag", Kind::Bool).default(json!(false)))
            .param(ParamSpec::query("extra", Kind::Str).optional()),
        get_query_params,
    )?;

    // Request bodies.
    router.add(
        Endpoint::post("/items/").param(ParamSpec::body("item", Kind::model(Item::schema()))),
        create_item,
    )?;
    router.add(
        Endpoint::put("/items/{item_id}")
            .param(ParamSpec::path("item_id", Kind::Int))
            .param(ParamSpec::body("item", Kind::model(Item::schema())))
            .param(ParamSpec::body("user", Kind::model(User::schema())))
            .param(ParamSpec::body("counter", Kind::Int)),
        update_item,
    )?;
    router.add(
        Endpoint::put("/items/single-model/{item_id}")
            .param(ParamSpec::path("item_id", Kind::Int))
            .param(ParamSpec::body("item", Kind::model(Item::schema())).embed()),
        update_single_model,
    )?;
    router.add(
        Endpoint::post("/create-user/")
            .param(ParamSpec::body("user", Kind::model(UserIn::schema())))
            .response_model(user_out_schema()),
        create_user,
    )?;

    // String and numeric validations.
    router.add(
        Endpoint::get("/items/").param(
            ParamSpec::query("q", Kind::Str)
                .alias("item-query")
                .optional()
                .min_length(3)
                .max_length(50)
                .pattern("^fixedquery$")?,
        ),
        items,
    )?;
    router.add(
        Endpoint::get("/items-multi-q/")
            .param(ParamSpec::query("q", Kind::list(Kind::Str)).default(json!(["zupa"]))),
        multi_q,
    )?;
    router.add(
        Endpoint::get("/new-path/{item_id}")
            .param(ParamSpec::path("item_id", Kind::Int).ge(1).lt(1000))
            .param(ParamSpec::query("q", Kind::Str)),
        new_path,
    )?;

    // Nested models.
    router.add(
        Endpoint::post("/items/create-images")
            .param(ParamSpec::body("images", Kind::list(Kind::model(Image::schema())))),
        create_images,
    )?;

    Ok(router)
}

async fn root(_ctx: Context) -> Result<Value, ApiError> {
    Ok(json!({ "message": "Hello World" }))
}

async fn read_prz(ctx: Context) -> Result<Value, ApiError> {
    Ok(json!({
        "Name": "PRZ",
        "ads_id": ctx.param::<Option<String>>("ads_id")?,
        "user_agent": ctx.param::<Option<String>>("user_agent")?,
        "x_token": ctx.param::<Option<Vec<String>>>("x_token")?,
    }))
}

async fn read_name(ctx: Context) -> Result<Value, ApiError> {
    let name: String = ctx.param("name")?;
    Ok(json!({ "Name": name, "Type": Kind::Str.type_name() }))
}

async fn read_age(ctx: Context) -> Result<Value, ApiError> {
    let age: i64 = ctx.param("age")?;
    Ok(json!({ "Age": age, "Type": Kind::Int.type_name() }))
}

async fn get_spice(ctx: Context) -> Result<Value, ApiError> {
    let spice: Spice = ctx.param("spice")?;
    Ok(json!({ "action": format!("use {}", spice.as_str()) }))
}

async fn get_query_params(ctx: Context) -> Result<Value, ApiError> {
    Ok(json!({
        "mandatory": ctx.param::<String>("mandatory")?,
        "flag": ctx.param::<bool>("flag")?,
        "extra": ctx.param::<Option<String>>("extra")?,
    }))
}

async fn create_item(ctx: Context) -> Result<Value, ApiError> {
    let mut item: Item = ctx.param("item")?;
    item.mark_happy();
    let brutto = item.brutto();
    Ok(serde_json::to_value(PricedItem { item, brutto })?)
}

async fn update_item(ctx: Context) -> Result<Value, ApiError> {
    let item: Item = ctx.param("item")?;
    let user: User = ctx.param("user")?;
    Ok(json!({
        "item_id": ctx.param::<i64>("item_id")?,
        "item": item,
        "user": user,
        "counter": ctx.param::<i64>("counter")?,
    }))
}

async fn update_single_model(ctx: Context) -> Result<Value, ApiError> {
    let item: Item = ctx.param("item")?;
    Ok(json!({ "item_id": ctx.param::<i64>("item_id")?, "item": item }))
}

// Echoes the full input; the response model strips the credentials.
async fn create_user(ctx: Context) -> Result<Value, ApiError> {
    let user: UserIn = ctx.param("user")?;
    Ok(serde_json::to_value(user)?)
}

async fn items(ctx: Context) -> Result<Value, ApiError> {
    let mut results = json!({ "fuu": "bar" });
    if let Some(q) = ctx.param::<Option<String>>("q")?.filter(|q| !q.is_empty()) {
        results["q"] = Value::String(q);
    }
    Ok(results)
}

async fn multi_q(ctx: Context) -> Result<Value, ApiError> {
    Ok(json!({ "q": ctx.param::<Vec<String>>("q")? }))
}

async fn new_path(ctx: Context) -> Result<Value, ApiError> {
    Ok(json!({
        "item_id": ctx.param::<i64>("item_id")?,
        "q": ctx.param::<String>("q")?,
    }))
}

async fn create_images(ctx: Context) -> Result<Value, ApiError> {
    let images: Vec<Image> = ctx.param("images")?;
    Ok(serde_json::to_value(images)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_registers_cleanly() {
        let router = router().unwrap();
        assert_eq!(router.len(), 14);
    }
}
