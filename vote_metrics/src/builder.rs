pub use crate::config::*;

/// A builder for query filters.
///
/// Every setter validates its input immediately, so an invalid value is reported
/// before any query is planned. Unset values select everything (`ALL`), and the
/// round defaults to the first one.
///
/// ```
/// use vote_metrics::builder::FilterBuilder;
/// # use vote_metrics::MetricsError;
///
/// let filter = FilterBuilder::new()
///     .state("SP")?
///     .round("1")?
///     .zone("37")?
///     .section("5")?
///     .build();
///
/// assert_eq!(filter.zone_group, "20-40");
/// assert_eq!(filter.section_code, "0005");
///
/// # Ok::<(), MetricsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    pub(crate) _state: StateFilter,
    pub(crate) _round: Round,
    pub(crate) _zone: CodeFilter,
    pub(crate) _section: CodeFilter,
}

impl Default for FilterBuilder {
    fn default() -> Self {
        FilterBuilder::new()
    }
}

impl FilterBuilder {
    pub fn new() -> FilterBuilder {
        FilterBuilder {
            _state: StateFilter::All,
            _round: Round::First,
            _zone: CodeFilter::All,
            _section: CodeFilter::All,
        }
    }

    pub fn state(self, state: &str) -> MetricsResult<FilterBuilder> {
        Ok(FilterBuilder {
            _state: StateFilter::parse(state)?,
            ..self
        })
    }

    pub fn round(self, round: &str) -> MetricsResult<FilterBuilder> {
        Ok(FilterBuilder {
            _round: Round::parse(round)?,
            ..self
        })
    }

    pub fn zone(self, zone: &str) -> MetricsResult<FilterBuilder> {
        Ok(FilterBuilder {
            _zone: CodeFilter::parse("zone", zone)?,
            ..self
        })
    }

    pub fn section(self, section: &str) -> MetricsResult<FilterBuilder> {
        Ok(FilterBuilder {
            _section: CodeFilter::parse("section", section)?,
            ..self
        })
    }

    pub fn build(&self) -> NormalizedFilter {
        NormalizedFilter {
            uf: self._state.uf_list(),
            turno: self._round.token().to_string(),
            zone_group: self._zone.zone_group_token(),
            zone_code: self._zone.code_token(),
            section_code: self._section.code_token(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_everything() {
        let nf = FilterBuilder::new().build();
        assert_eq!(nf.turno, "1");
        assert_eq!(nf.uf.len(), STATES.len() + 1);
        assert_eq!(nf.zone_group, ALL);
        assert_eq!(nf.zone_code, ALL);
        assert_eq!(nf.section_code, ALL);
    }

    #[test]
    fn zone_without_section() {
        let nf = FilterBuilder::new()
            .state("RJ")
            .and_then(|b| b.zone("799"))
            .unwrap()
            .build();
        assert_eq!(nf.uf, vec!["RJ".to_string()]);
        assert_eq!(nf.zone_group, "780-800");
        assert_eq!(nf.zone_code, "0799");
        assert_eq!(nf.section_code, ALL);
    }

    #[test]
    fn first_error_wins() {
        let e = FilterBuilder::new()
            .state("SP")
            .and_then(|b| b.round("3"))
            .and_then(|b| b.zone("900"))
            .unwrap_err();
        assert!(e.is_invalid_filter());
    }
}
