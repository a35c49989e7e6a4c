//! Request descriptors seen by the interception layer.

use fallow_core::Error;
pub use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// How the request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// The kind of resource the caller declared it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
    Other,
}

impl Destination {
    /// Script, style, image and font requests are static assets regardless of URL.
    pub fn is_static_asset(self) -> bool {
        matches!(self, Destination::Script | Destination::Style | Destination::Image | Destination::Font)
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navigate" => Ok(RequestMode::Navigate),
            "cors" | "" => Ok(RequestMode::Cors),
            "no-cors" => Ok(RequestMode::NoCors),
            "same-origin" => Ok(RequestMode::SameOrigin),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" => Ok(Destination::Empty),
            _ => Ok(Destination::Other),
        }
    }
}

/// An outbound request from the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, mode: RequestMode::default(), destination: Destination::default() }
    }

    /// A plain GET with no declared destination.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level document navigation.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, destination: Destination::Document, ..Self::get(url) }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_constructor() {
        let request = Request::navigate(Url::parse("https://example.com/dashboard").unwrap());
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.mode, RequestMode::Navigate);
        assert_eq!(request.destination, Destination::Document);
    }

    #[test]
    fn test_is_http() {
        assert!(Request::get(Url::parse("http://example.com/").unwrap()).is_http());
        assert!(Request::get(Url::parse("https://example.com/").unwrap()).is_http());
        assert!(!Request::get(Url::parse("chrome-extension://abc/script.js").unwrap()).is_http());
        assert!(!Request::get(Url::parse("data:text/plain,hi").unwrap()).is_http());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("NO-CORS".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_parse_destination() {
        assert_eq!("font".parse::<Destination>().unwrap(), Destination::Font);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
        assert_eq!("audioworklet".parse::<Destination>().unwrap(), Destination::Other);
    }

    #[test]
    fn test_static_asset_destinations() {
        assert!(Destination::Script.is_static_asset());
        assert!(Destination::Font.is_static_asset());
        assert!(!Destination::Document.is_static_asset());
        assert!(!Destination::Manifest.is_static_asset());
    }
}
