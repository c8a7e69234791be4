//! Bill endpoints.
//!
//! Bill numbers in paths refer to today's bills; numbers restart daily.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rebill_core::{Bill, BillUpdate, NewBill};

use crate::error::{ApiError, ApiResult};
use crate::printer::{print_now, render_receipt, spawn_print, ShopInfo};
use crate::routes::Message;
use crate::state::AppState;

/// `?date=` or `?start=&end=` on `GET /bills` and `GET /summary`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Window picked by a [`DateQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Day(NaiveDate),
    Range(NaiveDate, NaiveDate),
    Unbounded,
}

impl DateQuery {
    pub fn window(self) -> ApiResult<DateWindow> {
        match (self.date, self.start, self.end) {
            (Some(date), None, None) => Ok(DateWindow::Day(date)),
            (None, Some(start), Some(end)) => Ok(DateWindow::Range(start, end)),
            (None, None, None) => Ok(DateWindow::Unbounded),
            (None, Some(_), None) | (None, None, Some(_)) => {
                Err(ApiError::validation("start and end must be given together"))
            }
            _ => Err(ApiError::validation("use either date or start/end")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NextNumber {
    pub next_bill_no: i64,
}

/// `POST /bills`
///
/// The receipt is printed after the bill is stored.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewBill>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Bill>)> {
    let Json(request) = payload?;
    let bill = state.db.billing().create_bill(request).await?;

    if state.config.printer.enabled {
        print_receipt(&state, &bill).await;
    }

    Ok((StatusCode::CREATED, Json(bill)))
}

async fn print_receipt(state: &AppState, bill: &Bill) {
    let settings = match state.db.settings().snapshot().await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(bill_no = bill.bill_no, error = %e, "Skipping receipt, settings unavailable");
            return;
        }
    };
    if !settings.printer_enabled() {
        return;
    }

    let shop = ShopInfo::from_settings(&settings);
    let receipt = render_receipt(bill, &shop, state.config.printer.line_width);
    spawn_print(state.printer.clone(), receipt);
}

/// `GET /bills/today`
pub async fn today(State(state): State<AppState>) -> ApiResult<Json<Vec<Bill>>> {
    Ok(Json(state.db.billing().todays_bills().await?))
}

/// `GET /bills/next-number`
pub async fn next_number(State(state): State<AppState>) -> ApiResult<Json<NextNumber>> {
    let next_bill_no = state.db.billing().next_bill_number().await?;
    Ok(Json(NextNumber { next_bill_no }))
}

/// `GET /bills/all`: every bill, cancelled included.
pub async fn all(State(state): State<AppState>) -> ApiResult<Json<Vec<Bill>>> {
    Ok(Json(state.db.billing().all_bills().await?))
}

/// `GET /bills?date=` or `GET /bills?start=&end=`; confirmed bills only.
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Bill>>> {
    let Query(query) = query?;
    let billing = state.db.billing();

    let bills = match query.window()? {
        DateWindow::Day(date) => billing.bills_for_date(date).await?,
        DateWindow::Range(start, end) => billing.bills_between(start, end).await?,
        DateWindow::Unbounded => billing.all_confirmed_bills().await?,
    };
    Ok(Json(bills))
}

/// `GET /bills/{bill_no}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(bill_no): Path<i64>,
) -> ApiResult<Json<Bill>> {
    Ok(Json(state.db.billing().get_bill(bill_no).await?))
}

/// `PUT /bills/{bill_no}`
pub async fn update(
    State(state): State<AppState>,
    Path(bill_no): Path<i64>,
    payload: Result<Json<BillUpdate>, JsonRejection>,
) -> ApiResult<Json<Bill>> {
    let Json(update) = payload?;
    Ok(Json(state.db.billing().update_bill(bill_no, update).await?))
}

/// `POST /bills/{bill_no}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Path(bill_no): Path<i64>,
) -> ApiResult<Json<Bill>> {
    Ok(Json(state.db.billing().cancel_bill(bill_no).await?))
}

/// `POST /bills/{bill_no}/print`: prints today's bill `bill_no` again.
///
/// Unlike the print after creation, this waits for the printer and
/// reports its failure.
pub async fn reprint(
    State(state): State<AppState>,
    Path(bill_no): Path<i64>,
) -> ApiResult<Json<Message>> {
    let bill = state.db.billing().get_bill(bill_no).await?;
    let settings = state.db.settings().snapshot().await?;

    let shop = ShopInfo::from_settings(&settings);
    let receipt = render_receipt(&bill, &shop, state.config.printer.line_width);
    print_now(state.printer.clone(), receipt).await?;

    info!(bill_no, "Bill reprinted");
    Ok(Message::new(format!("Bill {} printed", bill_no)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::error::ErrorCode;
    use crate::printer::{PrintError, Receipt, ReceiptPrinter};
    use crate::routes::test_support::{product, state};
    use rebill_core::{BillLineRequest, BillStatus};
    use rebill_db::{Database, DbConfig};
    use std::sync::{Arc, Mutex};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_date_query_window() {
        let day = DateQuery {
            date: Some(date(14)),
            ..Default::default()
        };
        assert_eq!(day.window().unwrap(), DateWindow::Day(date(14)));

        let range = DateQuery {
            start: Some(date(1)),
            end: Some(date(14)),
            ..Default::default()
        };
        assert_eq!(range.window().unwrap(), DateWindow::Range(date(1), date(14)));
        assert_eq!(DateQuery::default().window().unwrap(), DateWindow::Unbounded);

        let half = DateQuery {
            start: Some(date(1)),
            ..Default::default()
        };
        assert_eq!(half.window().unwrap_err().code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_create_cancel_lifecycle() {
        let state = state().await;
        state
            .db
            .catalog()
            .create_product(product("A1", 25.0, None))
            .await
            .unwrap();

        let (status, Json(bill)) = create(
            State(state.clone()),
            Ok(Json(NewBill::cash(vec![BillLineRequest::new("A1", 2)]))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(bill.total_amount, 50.0);

        let Json(next) = next_number(State(state.clone())).await.unwrap();
        assert_eq!(next.next_bill_no, bill.bill_no + 1);

        let Json(cancelled) = cancel(State(state.clone()), Path(bill.bill_no)).await.unwrap();
        assert_eq!(cancelled.status, BillStatus::Cancelled);

        let Json(today_bills) = today(State(state.clone())).await.unwrap();
        assert!(today_bills.is_empty());
        let Json(every) = all(State(state.clone())).await.unwrap();
        assert_eq!(every.len(), 1);

        let err = cancel(State(state), Path(bill.bill_no)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_empty_bill_is_400() {
        let state = state().await;
        let err = create(State(state), Ok(Json(NewBill::cash(vec![]))))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    struct BrokenPrinter;

    impl ReceiptPrinter for BrokenPrinter {
        fn print(&self, _receipt: &Receipt) -> Result<(), PrintError> {
            Err(PrintError::Unavailable("paper out".to_string()))
        }
    }

    /// Keeps every receipt it is handed.
    #[derive(Default)]
    struct PaperTray(Mutex<Vec<Receipt>>);

    impl ReceiptPrinter for PaperTray {
        fn print(&self, receipt: &Receipt) -> Result<(), PrintError> {
            self.0.lock().unwrap().push(receipt.clone());
            Ok(())
        }
    }

    async fn state_with(printer: Arc<dyn ReceiptPrinter>) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .create_product(product("A1", 25.0, None))
            .await
            .unwrap();
        db.billing()
            .create_bill(NewBill::cash(vec![BillLineRequest::new("A1", 2)]))
            .await
            .unwrap();
        AppState::with_printer(db, ServerConfig::default(), printer)
    }

    #[tokio::test]
    async fn test_reprint_sends_receipt() {
        let tray = Arc::new(PaperTray::default());
        let state = state_with(tray.clone()).await;

        let Json(message) = reprint(State(state), Path(1)).await.unwrap();
        assert_eq!(message.message, "Bill 1 printed");

        let printed = tray.0.lock().unwrap();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].bill_no, 1);
        assert!(printed[0].lines.iter().any(|l| l.starts_with("TOTAL") && l.ends_with("50.00")));
    }

    #[tokio::test]
    async fn test_reprint_errors_reach_the_caller() {
        let state = state_with(Arc::new(BrokenPrinter)).await;

        let err = reprint(State(state.clone()), Path(1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PrintFailed);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("paper out"));

        let err = reprint(State(state.clone()), Path(7)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        // The bill itself is untouched by the failed print.
        assert_eq!(state.db.billing().get_bill(1).await.unwrap().status, BillStatus::Confirmed);
    }
}
