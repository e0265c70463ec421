//! Identifier source selection and parsing.
//!
//! Reach identifiers arrive either as a direct comma-separated list or as a
//! HydroShare resource token whose `nwm_comids.json` lists them. The choice of
//! source is a pure decision made here; fetching the resource is left to the
//! service layer.

use serde_json::Value as JsonValue;

use crate::errors::{ApiError, ApiResult};
use crate::types::{Coordinates, IdentifierSet, ReachId};

/// Validated HydroShare resource token.
///
/// Tokens are interpolated into a URL path, so only `[A-Za-z0-9_-]` is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceToken(String);

impl ResourceToken {
    pub fn parse(raw: &str) -> ApiResult<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ApiError::invalid(
                "hydroshare_id",
                format!("'{}' is not a valid HydroShare resource ID", raw),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a request's identifiers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierSource {
    Direct(IdentifierSet),
    Resource(ResourceToken),
}

impl IdentifierSource {
    /// Decide the identifier source for the data endpoints.
    ///
    /// A resource token takes precedence over direct identifiers.
    pub fn select(comids: Option<&str>, hydroshare_id: Option<&str>) -> ApiResult<Self> {
        if let Some(token) = non_blank(hydroshare_id) {
            return Ok(IdentifierSource::Resource(ResourceToken::parse(token)?));
        }
        if let Some(raw) = non_blank(comids) {
            return Ok(IdentifierSource::Direct(parse_comids(raw)?));
        }
        Err(ApiError::MissingParameter(
            "No valid comids found. Please provide valid comids or a valid HydroShare resource ID."
                .to_string(),
        ))
    }
}

/// How `/geometry` locates reaches.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySelector {
    Identifiers(IdentifierSet),
    Resource(ResourceToken),
    Nearest(Coordinates),
}

impl GeometrySelector {
    /// Precedence is identifiers, then resource token, then coordinates.
    pub fn select(
        comids: Option<&str>,
        hydroshare_id: Option<&str>,
        coordinates: Option<Coordinates>,
    ) -> ApiResult<Self> {
        if let Some(raw) = non_blank(comids) {
            return Ok(GeometrySelector::Identifiers(parse_comids(raw)?));
        }
        if let Some(token) = non_blank(hydroshare_id) {
            return Ok(GeometrySelector::Resource(ResourceToken::parse(token)?));
        }
        if let Some(point) = coordinates {
            return Ok(GeometrySelector::Nearest(point));
        }
        Err(ApiError::MissingParameter(
            "Please provide either \"comids\", \"hydroshare_id\", or (lat and lon) query parameters."
                .to_string(),
        ))
    }
}

/// Parse a comma-separated identifier list such as `"15039097, 1239657"`.
pub fn parse_comids(raw: &str) -> ApiResult<IdentifierSet> {
    let ids = raw
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i64>()
                .ok()
                .and_then(ReachId::new)
                .ok_or_else(|| {
                    ApiError::invalid(
                        "comids",
                        format!("'{}' is not a positive integer reach ID", token),
                    )
                })
        })
        .collect::<ApiResult<Vec<ReachId>>>()?;

    IdentifierSet::from_ids(ids)
        .ok_or_else(|| ApiError::invalid("comids", "no reach IDs supplied"))
}

/// Extract identifiers from a HydroShare `nwm_comids.json` document.
///
/// The document must be a JSON array of objects with a `comid` field holding
/// an integer or a string containing one.
pub fn parse_comid_document(token: &ResourceToken, body: &[u8]) -> ApiResult<IdentifierSet> {
    let doc: JsonValue = serde_json::from_slice(body).map_err(|e| {
        ApiError::IdentifierResolution(format!("resource {}: invalid JSON: {}", token.as_str(), e))
    })?;

    let items = doc.as_array().ok_or_else(|| {
        ApiError::IdentifierResolution(format!(
            "resource {}: expected a JSON array of comid objects",
            token.as_str()
        ))
    })?;

    let ids = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            comid_of(item).ok_or_else(|| {
                ApiError::IdentifierResolution(format!(
                    "resource {}: element {} has no usable comid",
                    token.as_str(),
                    index
                ))
            })
        })
        .collect::<ApiResult<Vec<ReachId>>>()?;

    IdentifierSet::from_ids(ids).ok_or_else(|| ApiError::NoIdentifiers(token.as_str().to_string()))
}

fn comid_of(item: &JsonValue) -> Option<ReachId> {
    let id = match item.get("comid")? {
        JsonValue::Number(n) => n.as_i64()?,
        JsonValue::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    ReachId::new(id)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ResourceToken {
        ResourceToken::parse("643dc03878704a30849536e302bdb2c0").unwrap()
    }

    #[test]
    fn test_parse_comids_preserves_order() {
        let set = parse_comids("15039097, 1239657,42").unwrap();
        let ids: Vec<i64> = set.iter().map(|id| id.get()).collect();
        assert_eq!(ids, vec![15039097, 1239657, 42]);
    }

    #[test]
    fn test_parse_comids_rejects_bad_tokens() {
        assert!(parse_comids("1,abc").is_err());
        assert!(parse_comids("1,,2").is_err());
        assert!(parse_comids("0").is_err());
        assert!(parse_comids("-7").is_err());
    }

    #[test]
    fn test_source_token_takes_precedence() {
        let source = IdentifierSource::select(Some("1,2"), Some("abc_123-x")).unwrap();
        assert!(matches!(source, IdentifierSource::Resource(t) if t.as_str() == "abc_123-x"));
    }

    #[test]
    fn test_source_direct() {
        let source = IdentifierSource::select(Some("12068774"), None).unwrap();
        match source {
            IdentifierSource::Direct(set) => assert_eq!(set.sql_list(), "12068774"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_source_blank_token_falls_back_to_direct() {
        let source = IdentifierSource::select(Some("5"), Some("  ")).unwrap();
        assert!(matches!(source, IdentifierSource::Direct(_)));
    }

    #[test]
    fn test_source_missing() {
        let err = IdentifierSource::select(None, None).unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_token_syntax_checked() {
        assert!(ResourceToken::parse("../etc/passwd").is_err());
        assert!(ResourceToken::parse("abc?x=1").is_err());
        assert!(IdentifierSource::select(None, Some("a b")).is_err());
    }

    #[test]
    fn test_geometry_precedence() {
        let point = Some(Coordinates { lat: 40.0, lon: -111.0 });

        assert!(matches!(
            GeometrySelector::select(Some("1"), Some("abc"), point).unwrap(),
            GeometrySelector::Identifiers(_)
        ));
        assert!(matches!(
            GeometrySelector::select(None, Some("abc"), point).unwrap(),
            GeometrySelector::Resource(_)
        ));
        assert!(matches!(
            GeometrySelector::select(None, None, point).unwrap(),
            GeometrySelector::Nearest(_)
        ));
        assert!(GeometrySelector::select(None, None, None).is_err());
    }

    #[test]
    fn test_comid_document() {
        let body = br#"[{"comid": 15039097}, {"comid": "1239657"}, {"comid": 15039097, "name": "dup"}]"#;
        let set = parse_comid_document(&token(), body).unwrap();
        assert_eq!(set.sql_list(), "15039097, 1239657");
    }

    #[test]
    fn test_comid_document_empty_array() {
        let err = parse_comid_document(&token(), b"[]").unwrap_err();
        assert!(matches!(err, ApiError::NoIdentifiers(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_comid_document_malformed() {
        let not_json = parse_comid_document(&token(), b"<html>Not Found</html>").unwrap_err();
        assert!(matches!(not_json, ApiError::IdentifierResolution(_)));

        let not_array = parse_comid_document(&token(), br#"{"comid": 1}"#).unwrap_err();
        assert!(matches!(not_array, ApiError::IdentifierResolution(_)));

        let missing = parse_comid_document(&token(), br#"[{"comid": 1}, {"id": 2}]"#).unwrap_err();
        assert!(missing.to_string().contains("element 1"));

        let null = parse_comid_document(&token(), br#"[{"comid": null}]"#).unwrap_err();
        assert_eq!(null.status_code(), 500);
    }
}
