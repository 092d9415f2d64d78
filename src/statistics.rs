use time::Date;
use time::macros::format_description;

use crate::api::{ApiClient, read_json};
use crate::constants::STATISTICS_PATH;
use crate::error::ApiResult;
use crate::models::{Period, Statistics, StatisticsQuery};

/// Formats a date the way the statistics endpoint expects (`YYYY-MM-DD`).
pub fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(format).unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(value: &str) -> Result<Date, String> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value.trim(), format).map_err(|_| format!("Invalid date format: {}", value))
}

impl StatisticsQuery {
    pub fn period(period: Period) -> Self {
        Self {
            period,
            start_date: None,
            end_date: None,
        }
    }

    pub fn custom(start: Date, end: Date) -> Self {
        Self {
            period: Period::Custom,
            start_date: Some(format_date(start)),
            end_date: Some(format_date(end)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatisticsService {
    api: ApiClient,
}

impl StatisticsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get(&self, query: &StatisticsQuery) -> ApiResult<Statistics> {
        let response = self.api.get_with_query(STATISTICS_PATH, query).await?;
        read_json(response).await
    }

    pub async fn daily(&self) -> ApiResult<Statistics> {
        self.get(&StatisticsQuery::period(Period::Day)).await
    }

    pub async fn monthly(&self) -> ApiResult<Statistics> {
        self.get(&StatisticsQuery::period(Period::Month)).await
    }

    pub async fn quarterly(&self) -> ApiResult<Statistics> {
        self.get(&StatisticsQuery::period(Period::Quarter)).await
    }

    pub async fn yearly(&self) -> ApiResult<Statistics> {
        self.get(&StatisticsQuery::period(Period::Year)).await
    }

    pub async fn custom(&self, start: Date, end: Date) -> ApiResult<Statistics> {
        self.get(&StatisticsQuery::custom(start, end)).await
    }
}
