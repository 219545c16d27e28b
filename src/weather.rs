//! Weather-station CSV payloads
//!
//! The personal-weather-station endpoint returns CSV with an HTML quirk:
//! every line ends in a literal `<br>` marker and blank lines appear
//! between records. The fetch itself lives outside this crate; this
//! module owns only the decoding of that text into typed observations,
//! each tagged with the station that produced it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::CsvError;

/// One decoded weather observation
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    /// Station code the payload was requested for
    pub station: String,
    /// Observation time, UTC
    pub time: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Dew point in Celsius
    pub dewpoint_c: Option<f64>,
    /// Pressure in hPa
    pub pressure_hpa: Option<f64>,
    /// Wind direction in degrees
    pub wind_direction_degrees: Option<f64>,
    /// Wind speed in km/h
    pub wind_speed_kmh: Option<f64>,
    /// Gust speed in km/h
    pub wind_gust_kmh: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Precipitation over the last hour in mm
    pub hourly_precip_mm: Option<f64>,
    /// Rain since local midnight in mm
    pub daily_rain_mm: Option<f64>,
}

/// Raw record as the endpoint names its columns
#[derive(Debug, Deserialize)]
struct RawObservation {
    #[serde(rename = "DateUTC")]
    date_utc: String,
    #[serde(rename = "TemperatureC")]
    temperature_c: Option<f64>,
    #[serde(rename = "DewpointC")]
    dewpoint_c: Option<f64>,
    #[serde(rename = "PressurehPa")]
    pressure_hpa: Option<f64>,
    #[serde(rename = "WindDirectionDegrees")]
    wind_direction_degrees: Option<f64>,
    #[serde(rename = "WindSpeedKMH")]
    wind_speed_kmh: Option<f64>,
    #[serde(rename = "WindSpeedGustKMH")]
    wind_gust_kmh: Option<f64>,
    #[serde(rename = "Humidity")]
    humidity: Option<f64>,
    #[serde(rename = "HourlyPrecipMM")]
    hourly_precip_mm: Option<f64>,
    #[serde(rename = "dailyrainMM")]
    daily_rain_mm: Option<f64>,
}

/// Decode a weather CSV payload into observations tagged with `station`
///
/// Strips the embedded `<br>` markers and blank lines before parsing.
/// Rows whose `DateUTC` cell cannot be parsed fail the whole batch with
/// [`CsvError::BadTimestamp`].
pub fn parse_weather_csv(text: &str, station: &str) -> Result<Vec<WeatherObservation>, CsvError> {
    let cleaned: String = text
        .replace("<br>", "")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let mut out = Vec::new();
    for record in reader.deserialize::<RawObservation>() {
        let raw = record?;
        let time = NaiveDateTime::parse_from_str(&raw.date_utc, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| CsvError::BadTimestamp {
                value: raw.date_utc.clone(),
            })?
            .and_utc();
        out.push(WeatherObservation {
            station: station.to_string(),
            time,
            temperature_c: raw.temperature_c,
            dewpoint_c: raw.dewpoint_c,
            pressure_hpa: raw.pressure_hpa,
            wind_direction_degrees: raw.wind_direction_degrees,
            wind_speed_kmh: raw.wind_speed_kmh,
            wind_gust_kmh: raw.wind_gust_kmh,
            humidity: raw.humidity,
            hourly_precip_mm: raw.hourly_precip_mm,
            daily_rain_mm: raw.daily_rain_mm,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
Time,TemperatureC,DewpointC,PressurehPa,WindDirection,WindDirectionDegrees,WindSpeedKMH,WindSpeedGustKMH,Humidity,HourlyPrecipMM,Conditions,Clouds,dailyrainMM,SoftwareType,DateUTC<br>
\n\
2019-07-01 10:00:00,18.3,12.1,1014.2,SSW,203,9.7,14.5,67,0.0,,,0.5,EasyWeather,2019-07-01 09:00:00<br>
\n\
2019-07-01 10:05:00,18.6,,1014.1,SSW,205,8.0,12.9,66,0.0,,,0.5,EasyWeather,2019-07-01 09:05:00<br>
";

    #[test]
    fn strips_markup_and_tags_station() {
        let obs = parse_weather_csv(SAMPLE, "ISOUTHAM99").unwrap();
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.station == "ISOUTHAM99"));
    }

    #[test]
    fn parses_utc_time_and_fields() {
        let obs = parse_weather_csv(SAMPLE, "ISOUTHAM99").unwrap();
        assert_eq!(
            obs[0].time,
            Utc.with_ymd_and_hms(2019, 7, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(obs[0].temperature_c, Some(18.3));
        assert_eq!(obs[0].wind_direction_degrees, Some(203.0));
        assert_eq!(obs[0].daily_rain_mm, Some(0.5));
    }

    #[test]
    fn empty_cells_are_missing() {
        let obs = parse_weather_csv(SAMPLE, "ISOUTHAM99").unwrap();
        assert_eq!(obs[1].dewpoint_c, None);
    }

    #[test]
    fn bad_time_fails_the_batch() {
        let payload = "TemperatureC,DateUTC<br>\n18.0,whenever<br>\n";
        assert!(matches!(
            parse_weather_csv(payload, "X"),
            Err(CsvError::BadTimestamp { .. })
        ));
    }

    #[test]
    fn empty_payload_yields_no_observations() {
        let obs = parse_weather_csv("\n\n", "X").unwrap();
        assert!(obs.is_empty());
    }
}
