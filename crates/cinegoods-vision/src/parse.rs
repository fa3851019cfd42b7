//! Recovery of the three-field extraction object from raw model text.

use std::sync::LazyLock;

use cinegoods_core::{Enrichment, UNKNOWN_GOODS};
use regex::Regex;
use serde_json::Value;

use crate::error::VisionError;

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing-comma regex"));

/// Removes every Markdown code-fence marker (```` ```json ```` and ```` ``` ````).
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// The slice from the first `{` to the last `}`, if both exist in order.
#[must_use]
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses raw model output into an [`Enrichment`], normalized.
///
/// The first pass strips fences and parses the outermost object. If that
/// fails, the second pass cuts the raw text to its outermost braces and
/// removes trailing commas before reparsing.
///
/// # Errors
///
/// Returns [`VisionError::Parse`] when neither pass yields a JSON object.
pub fn parse_extraction(raw: &str) -> Result<Enrichment, VisionError> {
    let cleaned = strip_code_fences(raw);
    let first = extract_object(&cleaned).unwrap_or(&cleaned);

    let value = match serde_json::from_str::<Value>(first) {
        Ok(v) => v,
        Err(first_err) => {
            tracing::debug!(error = %first_err, "model JSON did not parse, attempting repair");
            let cut = extract_object(raw).ok_or_else(|| VisionError::Parse {
                reason: format!("no JSON object in response: {first_err}"),
            })?;
            let repaired = TRAILING_COMMA.replace_all(cut, "$1");
            serde_json::from_str::<Value>(&repaired).map_err(|e| VisionError::Parse {
                reason: e.to_string(),
            })?
        }
    };

    let Value::Object(fields) = value else {
        return Err(VisionError::Parse {
            reason: "response JSON is not an object".to_string(),
        });
    };

    let movie_title = fields
        .get("movieTitle")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let goods_kind = fields
        .get("goodsKind")
        .or_else(|| fields.get("goodsType"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let locations = fields
        .get("locations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(normalize(Enrichment {
        movie_title,
        goods_kind,
        locations,
    }))
}

/// Trims fields, maps an empty or `Unknown` goods kind to `"unknown"`, and
/// drops blank locations. Idempotent.
#[must_use]
pub fn normalize(enrichment: Enrichment) -> Enrichment {
    let goods_kind = enrichment.goods_kind.trim();
    let goods_kind = if goods_kind.is_empty() || goods_kind.eq_ignore_ascii_case(UNKNOWN_GOODS) {
        UNKNOWN_GOODS.to_string()
    } else {
        goods_kind.to_string()
    };
    Enrichment {
        movie_title: enrichment.movie_title.trim().to_string(),
        goods_kind,
        locations: enrichment
            .locations
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use cinegoods_core::{ALL_LOCATIONS, GENERAL_MOVIE};

    use super::*;

    fn enrichment(movie: &str, goods: &str, locations: &[&str]) -> Enrichment {
        Enrichment {
            movie_title: movie.into(),
            goods_kind: goods.into(),
            locations: locations.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn fenced_json_is_recovered() {
        let raw = "```json\n{\"movieTitle\":\"X\",\"goodsKind\":\"Y\",\"locations\":[\"Z\"]}\n```";
        assert_eq!(parse_extraction(raw).unwrap(), enrichment("X", "Y", &["Z"]));
    }

    #[test]
    fn prose_around_object_is_ignored() {
        let raw = "Here is the result:\n{\"movieTitle\":\"듄: 파트 2\",\"goodsKind\":\"TTT\",\"locations\":[\"All\"]}\nHope this helps!";
        assert_eq!(
            parse_extraction(raw).unwrap(),
            enrichment("듄: 파트 2", "TTT", &[ALL_LOCATIONS])
        );
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let raw = "{\"movieTitle\":\"웡카\",\"goodsKind\":\"포스터\",\"locations\":[\"용산\",],}";
        assert_eq!(
            parse_extraction(raw).unwrap(),
            enrichment("웡카", "포스터", &["용산"])
        );
    }

    #[test]
    fn legacy_goods_type_field_is_accepted() {
        let raw = r#"{"movieTitle":"General","goodsType":"배지","locations":[]}"#;
        assert_eq!(
            parse_extraction(raw).unwrap(),
            enrichment(GENERAL_MOVIE, "배지", &[])
        );
    }

    #[test]
    fn non_string_locations_are_dropped() {
        let raw = r#"{"movieTitle":"A","goodsKind":"B","locations":["강남", 3, null, " ", {"x":1}]}"#;
        assert_eq!(parse_extraction(raw).unwrap().locations, vec!["강남"]);
    }

    #[test]
    fn missing_fields_fall_back_to_empty_and_unknown() {
        let parsed = parse_extraction("{}").unwrap();
        assert_eq!(parsed, enrichment("", "unknown", &[]));
    }

    #[test]
    fn text_without_object_is_parse_error() {
        let err = parse_extraction("I cannot read this image.").unwrap_err();
        assert!(matches!(err, VisionError::Parse { .. }));
    }

    #[test]
    fn array_response_is_parse_error() {
        let err = parse_extraction("[1, 2]").unwrap_err();
        assert!(matches!(err, VisionError::Parse { .. }));
    }

    #[test]
    fn normalize_trims_and_coerces() {
        let got = normalize(enrichment("  웡카 ", "  ", &[" 코엑스 ", "", "  "]));
        assert_eq!(got, enrichment("웡카", "unknown", &["코엑스"]));
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            enrichment(" A ", "Unknown", &[" x", "y "]),
            enrichment("", "", &[]),
            enrichment(GENERAL_MOVIE, "오리지널 티켓, TTT", &[ALL_LOCATIONS]),
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(once.clone()), once);
        }
    }

    #[test]
    fn extract_object_requires_ordered_braces() {
        assert_eq!(extract_object("} nothing {"), None);
        assert_eq!(extract_object("a {\"k\":{}} b"), Some("{\"k\":{}}"));
    }
}
