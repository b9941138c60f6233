//! Query parsing, validation and dispatch

use async_trait::async_trait;
use futures_util::future::join_all;
use reduct_client::QueryOptions;
use reduct_ds_core::{
    DataQuery, DatasourceError, QueryDataHandler, QueryDataRequest, Result, TimeRange,
};
use reduct_frames::{build_frames, process, DataResponse, Mode, QueryDataResponse};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::datasource::ReductDatasource;

/// Panel query model
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReductQuery {
    #[serde(default, alias = "Bucket")]
    pub bucket: String,
    #[serde(default, alias = "Entry")]
    pub entry: String,
    #[serde(default, alias = "Options")]
    pub options: ReductOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReductOptions {
    #[serde(alias = "Start")]
    pub start: Option<i64>,
    #[serde(alias = "Stop")]
    pub stop: Option<i64>,
    #[serde(alias = "When")]
    pub when: Option<serde_json::Value>,
    #[serde(alias = "Strict")]
    pub strict: bool,
    #[serde(alias = "Continuous")]
    pub continuous: bool,
    #[serde(alias = "Ext")]
    pub ext: Option<serde_json::Value>,
    #[serde(alias = "Mode")]
    pub mode: Option<Mode>,
}

impl ReductQuery {
    pub fn parse(json: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(json.clone()).map_err(|e| {
            error!(error = %e, "Failed to unmarshal query");
            DatasourceError::Validation("invalid query format".to_string())
        })
    }

    pub fn mode(&self) -> Mode {
        self.options.mode.unwrap_or_default()
    }

    /// Validate and build store options; explicit `start`/`stop` win over
    /// the host time range
    pub fn query_options(&self, range: &TimeRange) -> Result<QueryOptions> {
        if self.bucket.is_empty() || self.entry.is_empty() {
            return Err(DatasourceError::Validation("missing bucket or entry".to_string()));
        }
        if range.is_inverted() {
            return Err(DatasourceError::Validation("from time is after to time".to_string()));
        }

        let mut builder = QueryOptions::builder()
            .when(self.options.when.clone())
            .ext(self.options.ext.clone())
            .strict(self.options.strict)
            .continuous(self.options.continuous)
            .only_metadata(self.mode() == Mode::LabelOnly);

        let start = self.options.start.or(range.from.map(|t| t.timestamp_micros()));
        let stop = self.options.stop.or(range.to.map(|t| t.timestamp_micros()));
        if let Some(start) = start {
            builder = builder.start(start);
        }
        if let Some(stop) = stop {
            builder = builder.stop(stop);
        }

        Ok(builder.build())
    }
}

impl ReductDatasource {
    /// Run one query to completion; every failure becomes an error response
    #[instrument(skip(self, query), fields(ref_id = %query.ref_id))]
    pub async fn run_query(&self, query: &DataQuery) -> DataResponse {
        let metrics = self.metrics();
        let _in_flight = metrics.track_in_flight();
        let started = Instant::now();

        let response = match self.execute(query).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Query failed");
                DataResponse::error(e.status_code(), e.message())
            }
        };

        metrics.record_query(started.elapsed(), response.is_error());
        response
    }

    async fn execute(&self, query: &DataQuery) -> Result<DataResponse> {
        let model = ReductQuery::parse(&query.json)?;
        debug!(
            bucket = %model.bucket,
            entry = %model.entry,
            mode = %model.mode(),
            from = ?query.time_range.from,
            to = ?query.time_range.to,
            "QueryData received"
        );

        let options = model.query_options(&query.time_range)?;
        let bucket = self.store().bucket(&model.bucket).await?;
        let stream = bucket.query(&model.entry, &options).await?;
        let accumulator = process(stream, model.mode()).await?;

        let stats = accumulator.stats();
        self.metrics().record_points(stats);
        debug!(
            series = accumulator.len(),
            appended = stats.appended,
            coerced = stats.coerced,
            dropped = stats.dropped,
            "Query evaluated"
        );

        Ok(DataResponse::frames(build_frames(accumulator)))
    }
}

#[async_trait]
impl QueryDataHandler for ReductDatasource {
    /// Queries of a batch run concurrently and fail independently
    async fn query_data(&self, request: QueryDataRequest) -> Result<QueryDataResponse> {
        debug!(queries = request.queries.len(), "Received QueryData");

        let responses = join_all(request.queries.iter().map(|query| async move {
            (query.ref_id.clone(), self.run_query(query).await)
        }))
        .await;

        Ok(responses.into_iter().collect())
    }
}
