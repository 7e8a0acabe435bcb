use crate::config::FoldingConfig;
use crate::document::Document;
use crate::models::{FoldingRange, FoldingRangeKind};
use regex::Regex;

use super::{FoldingRangeProvider, ProviderError};

const REGION_PATTERN: &str = r"#region (.*)\n(?s:.)*?#endregion";

/// `#region <description>` ... `#endregion` blocks, behind any comment prefix
pub struct RegionRangesProvider {
    pattern: Regex,
}

impl RegionRangesProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            pattern: Regex::new(REGION_PATTERN)?,
        })
    }

    pub fn ranges(&self, document: &Document) -> Vec<FoldingRange> {
        let text = document.text().to_string();
        let rope = document.text();

        self.pattern
            .captures_iter(&text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let description = captures.get(1)?.as_str().trim_end_matches('\r');
                if description.is_empty() {
                    return None;
                }
                let start = rope.byte_to_line(whole.start());
                let end = rope.byte_to_line(whole.end());
                if start == end {
                    return None;
                }
                Some(
                    FoldingRange::new(start, end, description)
                        .with_start_column(document.first_non_whitespace(start))
                        .with_kind(FoldingRangeKind::Region),
                )
            })
            .collect()
    }
}

impl FoldingRangeProvider for RegionRangesProvider {
    fn name(&self) -> &'static str {
        "regions"
    }

    fn update_ranges(
        &mut self,
        document: &Document,
        config: &FoldingConfig,
        upstream: &[FoldingRange],
    ) -> Result<Vec<FoldingRange>, ProviderError> {
        let mut ranges = upstream.to_vec();
        if config.show_only_regions_descriptions {
            ranges.extend(self.ranges(document));
        }
        Ok(ranges)
    }
}
