//! RDB file header.
//!
//! An RDB file starts with `#` comment lines describing the retrieval,
//! followed by a tab-separated column-name line and a column-definition
//! line. Rows come after that.

use chrono::{DateTime, Utc};

use rdb_common::{LocationIdentifier, SiteTimeZone};

use crate::rows::RowShape;

const PREAMBLE: &[&str] = &[
    "# //UNITED STATES GEOLOGICAL SURVEY       http://water.usgs.gov/",
    "# //NATIONAL WATER INFORMATION SYSTEM     http://water.usgs.gov/data.html",
    "# //DATA ARE PROVISIONAL AND SUBJECT TO CHANGE UNTIL PUBLISHED BY USGS",
];

/// Everything the header reports about a retrieval.
#[derive(Debug, Clone)]
pub struct RdbHeader {
    pub shape: RowShape,
    pub location: LocationIdentifier,
    pub station_name: String,
    pub zone: SiteTimeZone,
    pub parameter_code: String,
    pub parameter_name: String,
    pub unit: String,
    /// Statistic code (daily) or UV type letter (instantaneous).
    pub stat_or_uv_type: String,
    pub series_identifier: String,
    pub range_start: String,
    pub range_end: String,
    pub retrieved: DateTime<Utc>,
}

impl RdbHeader {
    fn file_type(&self) -> &'static str {
        match self.shape {
            RowShape::Daily => "NWIS-I DAILY-VALUES",
            RowShape::Instant => "NWIS-I UNIT-VALUES",
        }
    }

    /// Render the header, ending with the column definition line.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = PREAMBLE.iter().map(|l| l.to_string()).collect();

        lines.push(format!(
            "# //RETRIEVED: {}",
            self.retrieved.format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(format!("# //FILE TYPE=\"{}\" EDITABLE=NO", self.file_type()));
        lines.push(format!(
            "# //STATION AGENCY=\"{:<5}\" NUMBER=\"{:<15}\" TIME_ZONE=\"{}\" DST_FLAG={}",
            self.location.agency_code,
            self.location.site_number,
            self.zone.zone_code,
            if self.zone.local_time_observed { 'Y' } else { 'N' }
        ));
        lines.push(format!("# //STATION NAME=\"{}\"", self.station_name));
        lines.push(format!(
            "# //PARAMETER CODE=\"{}\" SNAME=\"{}\" UNIT=\"{}\"",
            self.parameter_code, self.parameter_name, self.unit
        ));

        match self.shape {
            RowShape::Daily => {
                lines.push(format!("# //STATISTIC CODE=\"{}\"", self.stat_or_uv_type))
            }
            RowShape::Instant => lines.push(format!("# //TYPE CODE=\"{}\"", self.stat_or_uv_type)),
        }

        lines.push(format!("# //TIME SERIES IDENTIFIER=\"{}\"", self.series_identifier));
        lines.push(format!(
            "# //RANGE START=\"{}\" END=\"{}\"",
            self.range_start, self.range_end
        ));

        lines.push(self.shape.column_names().join("\t"));
        lines.push(self.shape.column_definitions().join("\t"));

        let mut header = lines.join("\n");
        header.push('\n');
        header
    }
}
