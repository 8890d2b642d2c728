//! HTTP access to `{base}/topology`.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::components::topology::RawSnapshot;
use crate::config::ApiConfig;

/// Shown when nothing more specific is known.
pub const FALLBACK_MESSAGE: &str = "Failed to fetch topology data";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
	#[error("network error: {0}")]
	Transport(String),
	#[error("server responded with status {status}")]
	Status {
		status: u16,
		/// The `error` field of the response body, when there was one.
		server_error: Option<String>,
	},
	#[error("malformed topology payload: {0}")]
	Malformed(String),
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
}

impl FetchError {
	/// Classifies a non-2xx response, keeping the server's own message.
	pub fn from_response(status: u16, body: &str) -> Self {
		let server_error = serde_json::from_str::<ErrorBody>(body)
			.ok()
			.and_then(|body| body.error)
			.filter(|message| !message.is_empty());
		Self::Status { status, server_error }
	}

	/// Message for the error box: the server's `error` field first, then the
	/// transport message, then a generic fallback.
	pub fn user_message(&self) -> String {
		match self {
			Self::Status { server_error: Some(message), .. } => message.clone(),
			Self::Status { status, .. } => format!("Request failed with status code {status}"),
			Self::Transport(message) | Self::Malformed(message) if !message.is_empty() => message.clone(),
			Self::Transport(_) | Self::Malformed(_) => FALLBACK_MESSAGE.to_owned(),
		}
	}
}

pub fn decode(body: &str) -> Result<RawSnapshot, FetchError> {
	serde_json::from_str(body).map_err(|err| FetchError::Malformed(err.to_string()))
}

/// Anything that can produce raw snapshots.
pub trait SnapshotSource {
	fn fetch(&self) -> impl Future<Output = Result<RawSnapshot, FetchError>> + 'static;
}

#[derive(Clone, Debug)]
pub struct HttpSnapshotSource {
	url: String,
}

impl HttpSnapshotSource {
	pub fn new(config: &ApiConfig) -> Self {
		Self {
			url: config.topology_url(),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}
}

impl SnapshotSource for HttpSnapshotSource {
	fn fetch(&self) -> impl Future<Output = Result<RawSnapshot, FetchError>> + 'static {
		let url = self.url().to_owned();
		async move {
			let (status, body) = get_text(&url).await?;
			if (200..300).contains(&status) {
				decode(&body)
			} else {
				Err(FetchError::from_response(status, &body))
			}
		}
	}
}

fn transport(value: JsValue) -> FetchError {
	let message = value
		.dyn_ref::<js_sys::Error>()
		.map(|err| String::from(err.message()))
		.or_else(|| value.as_string())
		.unwrap_or_default();
	FetchError::Transport(message)
}

async fn get_text(url: &str) -> Result<(u16, String), FetchError> {
	let window = web_sys::window().ok_or_else(|| FetchError::Transport("no window".to_owned()))?;

	let opts = RequestInit::new();
	opts.set_method("GET");
	opts.set_mode(RequestMode::Cors);
	let request = Request::new_with_str_and_init(url, &opts).map_err(transport)?;

	let response: Response = JsFuture::from(window.fetch_with_request(&request))
		.await
		.map_err(transport)?
		.dyn_into()
		.map_err(transport)?;
	let body = JsFuture::from(response.text().map_err(transport)?)
		.await
		.map_err(transport)?;
	Ok((response.status(), body.as_string().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_error_field_wins() {
		let err = FetchError::from_response(500, r#"{"error": "Proxmox API unreachable"}"#);
		assert_eq!(
			err,
			FetchError::Status {
				status: 500,
				server_error: Some("Proxmox API unreachable".into()),
			}
		);
		assert_eq!(err.user_message(), "Proxmox API unreachable");
	}

	#[test]
	fn status_without_body_names_the_code() {
		let err = FetchError::from_response(502, "<html>bad gateway</html>");
		assert_eq!(err.user_message(), "Request failed with status code 502");
		assert_eq!(FetchError::from_response(500, r#"{"error": ""}"#).user_message(), "Request failed with status code 500");
	}

	#[test]
	fn transport_message_then_fallback() {
		assert_eq!(FetchError::Transport("Network Error".into()).user_message(), "Network Error");
		assert_eq!(FetchError::Transport(String::new()).user_message(), FALLBACK_MESSAGE);
	}

	#[test]
	fn decode_rejects_non_json() {
		assert!(matches!(decode("not json"), Err(FetchError::Malformed(_))));
		let raw = decode(r#"{"nodes": [{"id": "a"}], "edges": []}"#).unwrap();
		assert_eq!(raw.nodes.len(), 1);
	}

	#[test]
	fn decode_rejects_bodies_without_graph() {
		assert!(matches!(decode("{}"), Err(FetchError::Malformed(_))));
		assert!(matches!(decode(r#"{"edges": []}"#), Err(FetchError::Malformed(_))));

		let err = decode(r#"{"error": "Proxmox client not configured"}"#).unwrap_err();
		assert!(matches!(&err, FetchError::Malformed(message) if message.contains("nodes")));
		assert_ne!(err.user_message(), FALLBACK_MESSAGE);
	}

	#[test]
	fn source_targets_topology_endpoint() {
		let config = ApiConfig::new("http://pve.lan:5000/api/").unwrap();
		assert_eq!(HttpSnapshotSource::new(&config).url(), "http://pve.lan:5000/api/topology");
	}
}
