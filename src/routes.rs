use actix_web::{get, post, put, web, HttpResponse};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::schemas::Member;
use crate::service::LedgerService;
use crate::split::NewExpense;

#[derive(Deserialize, Serialize)]
struct GroupJson {
    name: String,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    simplify_debts: bool,
}

#[derive(Deserialize, Serialize)]
struct SimplifyJson {
    enabled: bool,
}

#[derive(Deserialize)]
struct BalanceQuery {
    month: Option<String>,
}

/// Parses `YYYY-MM`.
fn parse_month(month: &str) -> Result<(i32, u32)> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|date| (date.year(), date.month()))
        .map_err(|_| SplitError::InvalidMonth(month.to_string()))
}

#[put("/groups/{id}")]
async fn add_group(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
    json: web::Json<GroupJson>,
) -> Result<HttpResponse> {
    let GroupJson {
        name,
        members,
        simplify_debts,
    } = json.into_inner();
    service
        .create_group(&id.into_inner(), name, members, simplify_debts)
        .await?;
    Ok(HttpResponse::Ok().body("Group added"))
}

#[post("/groups/{id}/expenses")]
async fn add_expense(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
    expense: web::Json<NewExpense>,
) -> Result<HttpResponse> {
    let expense = service
        .add_expense(&id.into_inner(), expense.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[put("/groups/{id}/simplify")]
async fn set_simplify(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
    json: web::Json<SimplifyJson>,
) -> Result<HttpResponse> {
    service
        .set_simplify_debts(&id.into_inner(), json.enabled)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/groups/{id}/balance")]
async fn get_balance(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let report = match query.month.as_deref() {
        Some(month) => {
            let (year, month) = parse_month(month)?;
            service.balances_for_month(&id, year, month).await?
        }
        None => service.balances(&id).await?,
    };
    Ok(HttpResponse::Ok().json(report))
}

#[get("/groups/{id}/settlement")]
async fn get_settlement(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.settlement(&id.into_inner()).await?))
}

#[get("/groups/{id}/debts")]
async fn get_debts(
    service: web::Data<LedgerService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.direct_debts(&id.into_inner()).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_group)
        .service(add_expense)
        .service(set_simplify)
        .service(get_balance)
        .service(get_settlement)
        .service(get_debts);
}
