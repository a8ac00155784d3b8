//! Canonicalization of raw filter values into the tokens stored in the dataset.
//!
//! The rules are strict: anything that is not a valid domain value or the `ALL`
//! sentinel is rejected, surrounding whitespace included. Falling back to
//! defaults is left to the callers.

use log::debug;
use snafu::prelude::*;

use crate::config::*;

impl StateFilter {
    pub fn parse(raw: &str) -> MetricsResult<StateFilter> {
        match raw {
            ALL => Ok(StateFilter::All),
            s if is_known_state(s) => Ok(StateFilter::Uf(s.to_string())),
            s => InvalidFilterSnafu {
                field: "state",
                value: s,
                reason: "not a known state code",
            }
            .fail(),
        }
    }

    /// The `uf` membership list for this filter.
    pub fn uf_list(&self) -> Vec<String> {
        match self {
            StateFilter::All => STATES
                .iter()
                .copied()
                .chain(std::iter::once(ALL))
                .map(|s| s.to_string())
                .collect(),
            StateFilter::Uf(s) => vec![s.clone()],
        }
    }
}

impl Round {
    pub fn parse(raw: &str) -> MetricsResult<Round> {
        match raw {
            "1" => Ok(Round::First),
            "2" => Ok(Round::Second),
            s => InvalidFilterSnafu {
                field: "round",
                value: s,
                reason: "expected 1 or 2",
            }
            .fail(),
        }
    }
}

impl CodeFilter {
    /// Parses a zone or section value. `field` only names the value in errors.
    pub fn parse(field: &'static str, raw: &str) -> MetricsResult<CodeFilter> {
        if raw == ALL {
            return Ok(CodeFilter::All);
        }
        let n: i64 = raw.parse().ok().context(InvalidFilterSnafu {
            field,
            value: raw,
            reason: "expected an integer or ALL",
        })?;
        ensure!(
            (0..=MAX_CODE as i64).contains(&n),
            OutOfRangeSnafu { field, value: n }
        );
        Ok(CodeFilter::Code(n as u16))
    }

    /// Zero-padded to 4 digits, or `ALL`.
    pub fn code_token(&self) -> String {
        match self {
            CodeFilter::All => ALL.to_string(),
            CodeFilter::Code(n) => format!("{:04}", n),
        }
    }

    /// The `[lo, hi)` bucket of width 20 holding this zone, or `ALL`.
    pub fn zone_group_token(&self) -> String {
        match self {
            CodeFilter::All => ALL.to_string(),
            CodeFilter::Code(n) => {
                let lo = (n / ZONE_GROUP_WIDTH) * ZONE_GROUP_WIDTH;
                format!("{}-{}", lo, lo + ZONE_GROUP_WIDTH)
            }
        }
    }
}

pub fn normalize_zone_group(zone: &str) -> MetricsResult<String> {
    Ok(CodeFilter::parse("zone", zone)?.zone_group_token())
}

/// Applies to both zone and section codes.
pub fn normalize_numeric_code(value: &str) -> MetricsResult<String> {
    Ok(CodeFilter::parse("code", value)?.code_token())
}

pub fn normalize_state_list(state: &str) -> MetricsResult<Vec<String>> {
    Ok(StateFilter::parse(state)?.uf_list())
}

pub fn normalize_round(round: &str) -> MetricsResult<String> {
    Ok(Round::parse(round)?.token().to_string())
}

impl Filter {
    pub fn normalize(&self) -> MetricsResult<NormalizedFilter> {
        let nf = crate::builder::FilterBuilder::new()
            .state(&self.state)?
            .round(&self.round)?
            .zone(&self.zone)?
            .section(&self.section)?
            .build();
        debug!("normalize: {:?} -> {:?}", self, nf);
        Ok(nf)
    }
}
