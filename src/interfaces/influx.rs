use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::data_mgmt::models::Point;

const WRITE_PATH: &str = "write";
const WRITE_BATCH_SIZE: usize = 10;
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_RETRIES: u32 = 2;

#[derive(Error, Debug)]
pub enum InfluxError {
    #[error("invalid InfluxDB URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("InfluxDB returned HTTP {0}: {1}")]
    Status(u16, String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Writer for the InfluxDB v1 HTTP line-protocol endpoint.
pub struct InfluxClient {
    agent: ureq::Agent,
    write_url: Url,
    username: String,
    password: String,
    database: String,
}

impl InfluxClient {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, InfluxError> {
        let agent = ureq::AgentBuilder::new().timeout(WRITE_TIMEOUT).build();
        Ok(InfluxClient {
            agent,
            write_url: Url::parse(&format!("http://{host}:{port}"))?.join(WRITE_PATH)?,
            username: username.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        })
    }

    /// Writes the points in batches of [`WRITE_BATCH_SIZE`] per request,
    /// stopping at the first failed batch.
    pub fn write_points(&self, points: &[Point]) -> Result<(), InfluxError> {
        for batch in points.chunks(WRITE_BATCH_SIZE) {
            self.write_batch(batch)?;
        }
        Ok(())
    }

    fn write_batch(&self, batch: &[Point]) -> Result<(), InfluxError> {
        let body = to_line_protocol(batch);
        log::trace!("writing batch:\n{body}");

        let mut attempts = 0;
        loop {
            match self
                .agent
                .post(self.write_url.as_str())
                .query("db", &self.database)
                .query("u", &self.username)
                .query("p", &self.password)
                .query("precision", "s")
                .send_string(&body)
            {
                Ok(_) => return Ok(()),
                Err(ureq::Error::Status(code, response)) => {
                    return Err(InfluxError::Status(
                        code,
                        response.into_string().unwrap_or_default(),
                    ));
                }
                // Connection-level failures get a fixed retry budget.
                Err(ureq::Error::Transport(e)) if attempts < WRITE_RETRIES => {
                    attempts += 1;
                    log::warn!("InfluxDB write failed ({e}); retry {attempts}/{WRITE_RETRIES}");
                }
                Err(ureq::Error::Transport(e)) => return Err(InfluxError::Transport(e.to_string())),
            }
        }
    }
}

fn to_line_protocol(points: &[Point]) -> String {
    points
        .iter()
        .map(point_to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn point_to_line(point: &Point) -> String {
    let mut line = escape_measurement(point.measurement);
    for (key, value) in &point.tags {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }
    line.push(' ');
    let fields = point
        .fields
        .iter()
        .map(|(key, value)| format!("{}={}", escape_key(key), value.to_line_protocol()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str(&fields);
    line.push(' ');
    line.push_str(&point.timestamp_secs().to_string());
    line
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::data_mgmt::models::FieldValue;

    fn sample_point(day: u32, value: i64) -> Point {
        let time = NaiveDate::from_ymd_opt(2020, 9, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut point = Point::new("enedis_consumption_per_day", time);
        point.set_field("value", FieldValue::Integer(value));
        point
    }

    #[test]
    fn points_render_as_line_protocol() {
        let mut point = sample_point(8, 100);
        point.set_field("measure_type", FieldValue::String("B".into()));
        point.set_field("subscribed_power", FieldValue::Integer(6));

        // Fields come out in key order; no tags means none are rendered.
        assert_eq!(
            point_to_line(&point),
            "enedis_consumption_per_day measure_type=\"B\",subscribed_power=6i,value=100i 1599523200"
        );
    }

    #[test]
    fn tags_and_keys_are_escaped() {
        let mut point = sample_point(8, 100);
        point.tags.insert("usage point".into(), "a=b".into());
        assert_eq!(
            point_to_line(&point),
            "enedis_consumption_per_day,usage\\ point=a\\=b value=100i 1599523200"
        );
    }

    #[test]
    fn writes_are_batched_ten_points_at_a_time() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/write")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("db".into(), "enedis".into()),
                mockito::Matcher::UrlEncoded("precision".into(), "s".into()),
            ]))
            .with_status(204)
            .expect(3)
            .create();

        let url = Url::parse(&server.url()).unwrap();
        let client = InfluxClient::new(
            url.host_str().unwrap(),
            url.port().unwrap(),
            "username",
            "password",
            "enedis",
        )
        .unwrap();

        let points: Vec<Point> = (0u32..25).map(|i| sample_point(1 + i % 28, 100)).collect();
        client.write_points(&points).unwrap();
        mock.assert();
    }

    #[test]
    fn server_errors_carry_the_response_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/write")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": "authorization failed"}"#)
            .create();

        let url = Url::parse(&server.url()).unwrap();
        let client = InfluxClient::new(
            url.host_str().unwrap(),
            url.port().unwrap(),
            "username",
            "wrong",
            "enedis",
        )
        .unwrap();

        let err = client.write_points(&[sample_point(8, 100)]).unwrap_err();
        match err {
            InfluxError::Status(401, body) => assert!(body.contains("authorization failed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
