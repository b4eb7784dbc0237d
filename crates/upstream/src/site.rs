//! NWIS site web service client.
//!
//! The site service answers in RDB: `#` comments, a column-name line, a
//! column-definition line, then one line per site. Only the last data line
//! is used.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use rdb_common::{LocationIdentifier, RdbError, RdbResult, SiteTimeZone};

use crate::{transport_error, SiteRecord, SiteService};

const REQUIRED_COLUMNS: [&str; 5] = ["agency_cd", "site_no", "station_nm", "tz_cd", "local_time_fg"];

/// Parse the site service's RDB response.
pub fn parse_site_table(text: &str) -> RdbResult<SiteRecord> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty());

    let not_found = |why: &str| RdbError::NotFound(format!("site metadata: {}", why));

    let columns: Vec<&str> = lines
        .next()
        .ok_or_else(|| not_found("empty response"))?
        .split('\t')
        .collect();

    // Column definitions ("5s\t15s\t...") carry nothing we need.
    lines.next().ok_or_else(|| not_found("no column definitions"))?;

    let row: Vec<&str> = lines
        .last()
        .ok_or_else(|| not_found("no site rows"))?
        .split('\t')
        .collect();

    let mut values = Vec::with_capacity(REQUIRED_COLUMNS.len());
    for name in REQUIRED_COLUMNS {
        let index = columns
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| not_found(&format!("missing column {}", name)))?;
        let value = row
            .get(index)
            .ok_or_else(|| not_found(&format!("short row, no {}", name)))?;
        values.push(value.trim());
    }

    let [agency, site_no, station_name, tz_cd, local_time_fg] = values[..] else {
        return Err(not_found("unreadable row"));
    };

    if site_no.is_empty() {
        return Err(not_found("empty site number"));
    }

    Ok(SiteRecord {
        location: LocationIdentifier::new(agency, site_no),
        station_name: station_name.to_string(),
        zone: SiteTimeZone::new(tz_cd, local_time_fg.eq_ignore_ascii_case("Y"))?,
    })
}

/// Client for `https://<hostname>/nwis/site/`.
pub struct NwisSiteClient {
    client: Client,
    hostname: String,
}

impl NwisSiteClient {
    pub fn new(hostname: impl Into<String>, timeout: Duration) -> RdbResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| transport_error("NWIS site client", e))?;

        Ok(Self {
            client,
            hostname: hostname.into(),
        })
    }

    fn site_url(&self) -> String {
        if self.hostname.starts_with("http://") || self.hostname.starts_with("https://") {
            format!("{}/nwis/site/", self.hostname.trim_end_matches('/'))
        } else {
            format!("https://{}/nwis/site/", self.hostname)
        }
    }
}

#[async_trait]
impl SiteService for NwisSiteClient {
    #[instrument(skip(self), fields(site = %location))]
    async fn site(&self, location: &LocationIdentifier) -> RdbResult<SiteRecord> {
        let url = self.site_url();
        debug!(url = %url, "Requesting site metadata");

        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "rdb"),
                ("sites", location.site_number.as_str()),
                ("agencyCd", location.agency_code.as_str()),
                ("siteOutput", "expanded"),
                ("siteStatus", "all"),
            ])
            .send()
            .await
            .map_err(|e| transport_error("NWIS site service", e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RdbError::NotFound(format!("site {}", location)));
        }
        if !status.is_success() {
            return Err(RdbError::upstream(format!(
                "NWIS site service returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("NWIS site service", e))?;

        histogram!("upstream_request_duration_ms", "call" => "site")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        parse_site_table(&body).map_err(|e| match e {
            RdbError::NotFound(why) => RdbError::NotFound(format!("site {}: {}", location, why)),
            other => other,
        })
    }
}
