use axum::{extract::Query, Json};

use crate::{
    models::calendar::{DateRangeQuery, DayEntry},
    routes::{error_response, ApiError},
    services::calendar::expand_range,
};

/// GET /calendar/days?start=2025-06-02&end=2025-06-08
pub async fn list_days(Query(q): Query<DateRangeQuery>) -> Result<Json<Vec<DayEntry>>, ApiError> {
    expand_range(q.start, q.end).map(Json).map_err(error_response)
}
