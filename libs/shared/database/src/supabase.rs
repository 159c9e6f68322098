use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_models::appointment::{Appointment, NewAppointment};

use crate::error::{DatabaseError, Result};
use crate::gateway::{AppointmentChanges, AppointmentFilter, AppointmentGateway, AppointmentOrder};

/// Expected table shape: `id bigint` identity, `patient_name text`, `reason text`,
/// `start_time timestamp` (without time zone, so values round-trip as naive
/// wall-clock times), `canceled boolean`, `created_at timestamptz`.
const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self) -> AnyResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.anon_key))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> AnyResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> AnyResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

/// Appointment gateway backed by a Supabase (PostgREST) `appointments` table.
///
/// PostgREST runs every request in its own transaction, so the single PATCH
/// issued by `update_matching` is atomic.
pub struct SupabaseGateway {
    supabase: SupabaseClient,
}

impl SupabaseGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn filter_params(filter: &AppointmentFilter) -> Vec<String> {
    let mut params = Vec::new();

    if let Some(name) = &filter.patient_name {
        params.push(format!("patient_name=eq.{}", urlencoding::encode(name)));
    }
    if let Some(start) = &filter.starts_at_or_after {
        params.push(format!("start_time=gte.{}", urlencoding::encode(&format_timestamp(start))));
    }
    if let Some(end) = &filter.starts_before {
        params.push(format!("start_time=lt.{}", urlencoding::encode(&format_timestamp(end))));
    }
    if let Some(canceled) = filter.canceled {
        params.push(format!("canceled=eq.{}", canceled));
    }

    params
}

fn appointments_path(params: Vec<String>) -> String {
    if params.is_empty() {
        APPOINTMENTS_PATH.to_string()
    } else {
        format!("{}?{}", APPOINTMENTS_PATH, params.join("&"))
    }
}

fn decode_rows(rows: Vec<Value>) -> Result<Vec<Appointment>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| DatabaseError::Decode(e.to_string())))
        .collect()
}

#[async_trait]
impl AppointmentGateway for SupabaseGateway {
    async fn create(&self, record: NewAppointment) -> Result<Appointment> {
        debug!("Creating appointment for: {}", record.patient_name);

        let appointment_data = json!({
            "patient_name": record.patient_name,
            "reason": record.reason,
            "start_time": format_timestamp(&record.start_time),
            "canceled": record.canceled
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                Some(appointment_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| DatabaseError::Supabase(e.to_string()))?;

        let appointment = decode_rows(result)?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Supabase("insert returned no representation".to_string()))?;

        info!(appointment_id = appointment.id, "appointment created");
        Ok(appointment)
    }

    async fn query(&self, filter: AppointmentFilter, order: AppointmentOrder) -> Result<Vec<Appointment>> {
        let mut params = filter_params(&filter);
        params.push(
            match order {
                AppointmentOrder::StartTimeAsc => "order=start_time.asc,id.asc",
            }
            .to_string(),
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &appointments_path(params), None)
            .await
            .map_err(|e| DatabaseError::Supabase(e.to_string()))?;

        decode_rows(result)
    }

    async fn update_matching(&self, filter: AppointmentFilter, changes: AppointmentChanges) -> Result<u64> {
        let mut update_data = serde_json::Map::new();
        if let Some(canceled) = changes.canceled {
            update_data.insert("canceled".to_string(), json!(canceled));
        }
        if update_data.is_empty() {
            return Err(DatabaseError::InvalidUpdate("no field changes supplied".to_string()));
        }

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &appointments_path(filter_params(&filter)),
                Some(Value::Object(update_data)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| DatabaseError::Supabase(e.to_string()))?;

        info!(changed = result.len(), "appointments updated");
        Ok(result.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_filter_params_encode_values() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 24).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let filter = AppointmentFilter::new()
            .patient_name("John Doe")
            .starting_between(start, end)
            .canceled(false);

        assert_eq!(
            appointments_path(filter_params(&filter)),
            "/rest/v1/appointments?patient_name=eq.John%20Doe\
             &start_time=gte.2026-01-24T00%3A00%3A00\
             &start_time=lt.2026-01-25T00%3A00%3A00\
             &canceled=eq.false"
        );
    }

    #[test]
    fn test_unfiltered_path() {
        assert_eq!(appointments_path(Vec::new()), APPOINTMENTS_PATH);
    }
}
