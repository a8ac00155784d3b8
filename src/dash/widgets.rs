use serde::{Deserialize, Serialize};

use crate::dash::params::DashParams;
use crate::dash::*;

pub const TITLE: &str = "Tempo de Votação";

/// Headline figures. `None` when the dataset has no value for them.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BigNumbers {
    pub votos: Option<i64>,
    pub secoes: Option<i64>,
    pub tempo_voto_medio: Option<f64>,
    pub tempo_biometria_medio: Option<f64>,
}

/// The difference between the national mean voting time and the one of a state.
/// Positive values mean the state votes faster than the country.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StateDelta {
    pub uf: String,
    pub delta: Option<f64>,
}

/// Everything the dashboard shows for one set of parameters.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub title: String,
    pub subtitle: String,
    pub params: DashParams,
    pub votos: String,
    pub secoes: String,
    pub tempo_medio: String,
    pub tempo_medio_biometria: String,
    pub figures: BigNumbers,
    pub map: Vec<StateDelta>,
    pub rows: usize,
}

/// Runs the query for `params` and computes every widget from its rows.
pub fn build_dashboard(
    engine: &MetricsEngine,
    params: &DashParams,
) -> DashResult<(DashboardSummary, ResultSet)> {
    let rs = engine
        .get_vote_time_metrics(&params.uf, &params.turno, &params.zona, &params.secao)
        .context(MetricsSnafu {})?;
    let rows = rs.rows().context(MetricsSnafu {})?;

    let figures = big_numbers(params, &rows);
    let map = if params.uf == ALL {
        state_deltas(&rows)
    } else {
        vec![]
    };
    let summary = DashboardSummary {
        title: TITLE.to_string(),
        subtitle: subtitle(params),
        params: params.clone(),
        votos: figures.votos.map(format_count).unwrap_or_else(missing),
        secoes: figures.secoes.map(format_count).unwrap_or_else(missing),
        tempo_medio: figures.tempo_voto_medio.map(format_time).unwrap_or_else(missing),
        tempo_medio_biometria: figures
            .tempo_biometria_medio
            .map(format_time)
            .unwrap_or_else(missing),
        figures,
        map,
        rows: rows.len(),
    };
    Ok((summary, rs))
}

fn missing() -> String {
    "-".to_string()
}

/// The rows the headline figures are taken from.
///
/// When every state is selected, the result also holds one row per state; only
/// the national aggregate counts.
pub fn headline_rows<'a>(params: &DashParams, rows: &'a [MetricsRow]) -> Vec<&'a MetricsRow> {
    if params.uf == ALL {
        rows.iter().filter(|r| r.is_national_aggregate()).collect()
    } else {
        rows.iter().collect()
    }
}

pub fn big_numbers(params: &DashParams, rows: &[MetricsRow]) -> BigNumbers {
    let selected = headline_rows(params, rows);
    BigNumbers {
        votos: selected.iter().filter_map(|r| r.total_votos).max(),
        secoes: selected.iter().filter_map(|r| r.total_secoes).max(),
        tempo_voto_medio: max_f64(selected.iter().filter_map(|r| r.tempo_voto_medio)),
        tempo_biometria_medio: max_f64(selected.iter().filter_map(|r| r.tempo_biometria_medio)),
    }
}

fn max_f64(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.filter(|v| !v.is_nan()).reduce(f64::max)
}

/// Heat map values, one per state, in the order of the rows.
pub fn state_deltas(rows: &[MetricsRow]) -> Vec<StateDelta> {
    let national = max_f64(
        rows.iter()
            .filter(|r| r.is_national_aggregate())
            .filter_map(|r| r.tempo_voto_medio),
    );
    rows.iter()
        .filter(|r| !r.is_national_aggregate())
        .map(|r| StateDelta {
            uf: r.uf.clone(),
            delta: national.zip(r.tempo_voto_medio).map(|(n, t)| n - t),
        })
        .collect()
}

pub fn subtitle(params: &DashParams) -> String {
    let mut s = format!("{}º Turno", params.turno);
    if params.uf != ALL {
        s.push_str(&format!(" - {}", params.uf));
    }
    if params.zona != ALL {
        s.push_str(&format!(" - Zona {}", params.zona));
    }
    if params.secao != ALL {
        s.push_str(&format!(", Seção {}", params.secao));
    }
    s
}

/// Groups the digits by thousands, separated by spaces: `1 234 567`.
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut res = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push(' ');
        }
        res.push(c);
    }
    if n < 0 {
        res.insert(0, '-');
    }
    res
}

/// Formats a duration in seconds, omitting the leading zero units: `1h 0m 5s`, `42s`.
pub fn format_time(seconds: f64) -> String {
    // Truncates to whole seconds; negative values count as zero.
    let mut t = seconds as u64;
    let days = t / (24 * 3600);
    t %= 24 * 3600;
    let hours = t / 3600;
    t %= 3600;
    let minutes = t / 60;
    let secs = t % 60;

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, _) => format!("{}m {}s", minutes, secs),
        (0, _, _) => format!("{}h {}m {}s", hours, minutes, secs),
        _ => format!("{}d {}h {}m {}s", days, hours, minutes, secs),
    }
}
