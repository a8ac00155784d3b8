// Dashboard parameters, as found in the page's query string.
//
// Unlike the query engine, this layer is lenient: a missing or unrecognized
// value is replaced by its default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dash::*;

pub const DEFAULT_TURNO: &str = "1";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashParams {
    pub uf: String,
    pub turno: String,
    pub zona: String,
    pub secao: String,
}

impl Default for DashParams {
    fn default() -> Self {
        DashParams {
            uf: ALL.to_string(),
            turno: DEFAULT_TURNO.to_string(),
            zona: ALL.to_string(),
            secao: ALL.to_string(),
        }
    }
}

impl DashParams {
    /// Picks every parameter from `query`, falling back to the defaults.
    pub fn select(query: &HashMap<String, String>) -> DashParams {
        let d = DashParams::default();
        DashParams {
            uf: select_parameter(query, "uf", d.uf, accept_uf),
            turno: select_parameter(query, "turno", d.turno, accept_turno),
            zona: select_parameter(query, "zona", d.zona, accept_code),
            secao: select_parameter(query, "secao", d.secao, accept_code),
        }
    }

    pub fn from_query_string(qs: &str) -> DashParams {
        DashParams::select(&parse_query_string(qs))
    }
}

fn select_parameter(
    query: &HashMap<String, String>,
    key: &str,
    default: String,
    accepted: impl Fn(&str) -> bool,
) -> String {
    match query.get(key) {
        Some(v) if accepted(v) => v.clone(),
        Some(v) => {
            debug!("select_parameter: {}={:?} not accepted, using {}", key, v, default);
            default
        }
        None => default,
    }
}

fn accept_uf(v: &str) -> bool {
    v == ALL || is_known_state(v)
}

fn accept_turno(v: &str) -> bool {
    v == "1" || v == "2"
}

// Only the plain decimal spelling is accepted: "7", not "007".
fn accept_code(v: &str) -> bool {
    v == ALL
        || v
            .parse::<u16>()
            .map(|n| n <= MAX_CODE && n.to_string() == v)
            .unwrap_or(false)
}

pub fn parse_query_string(qs: &str) -> HashMap<String, String> {
    let qs = qs.trim_start_matches('?');
    url::form_urlencoded::parse(qs.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Combines the query string and the explicit flags of the `query` command.
///
/// Explicit flags win over the query string. They are only checked here when
/// `--lenient` is passed; otherwise they go to the query engine untouched.
pub fn resolve(qa: &QueryArgs) -> DashParams {
    let mut query = qa
        .params
        .as_deref()
        .map(parse_query_string)
        .unwrap_or_default();
    let explicit = [
        ("uf", &qa.uf),
        ("turno", &qa.turno),
        ("zona", &qa.zona),
        ("secao", &qa.secao),
    ];

    if qa.lenient {
        for (k, v) in explicit {
            if let Some(v) = v {
                query.insert(k.to_string(), v.clone());
            }
        }
        return DashParams::select(&query);
    }

    let base = DashParams::select(&query);
    DashParams {
        uf: qa.uf.clone().unwrap_or(base.uf),
        turno: qa.turno.clone().unwrap_or(base.turno),
        zona: qa.zona.clone().unwrap_or(base.zona),
        secao: qa.secao.clone().unwrap_or(base.secao),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QueryArgs {
        QueryArgs {
            uf: None,
            turno: None,
            zona: None,
            secao: None,
            params: None,
            lenient: false,
            out: None,
            reference: None,
            table: false,
        }
    }

    #[test]
    fn empty_query_gives_defaults() {
        assert_eq!(DashParams::from_query_string(""), DashParams::default());
        assert_eq!(resolve(&args()), DashParams::default());
    }

    #[test]
    fn accepted_values() {
        let p = DashParams::from_query_string("?uf=SP&turno=2&zona=37&secao=5");
        assert_eq!(
            p,
            DashParams {
                uf: "SP".to_string(),
                turno: "2".to_string(),
                zona: "37".to_string(),
                secao: "5".to_string(),
            }
        );
    }

    #[test]
    fn unrecognized_values_fall_back() {
        let p = DashParams::from_query_string("uf=XX&turno=3&zona=800&secao=007&other=1");
        assert_eq!(p, DashParams::default());
        let p = DashParams::from_query_string("zona=abc&secao=-1");
        assert_eq!(p.zona, ALL);
        assert_eq!(p.secao, ALL);
    }

    #[test]
    fn flags_override_query_string() {
        let mut qa = args();
        qa.params = Some("uf=SP&zona=10".to_string());
        qa.zona = Some("900".to_string());
        let p = resolve(&qa);
        assert_eq!(p.uf, "SP");
        // Left for the engine to reject.
        assert_eq!(p.zona, "900");
    }

    #[test]
    fn lenient_flags() {
        let mut qa = args();
        qa.lenient = true;
        qa.uf = Some("XX".to_string());
        qa.turno = Some("2".to_string());
        let p = resolve(&qa);
        assert_eq!(p.uf, ALL);
        assert_eq!(p.turno, "2");
    }
}
