use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub year: i16,
    pub release_date: Date,
    pub run_time: i32,
    pub rating: i32,
    pub mpaa_rating: String,
    #[serde(skip)]
    pub created_at: Timestamp,
    #[serde(skip)]
    pub updated_at: Timestamp,
    pub movie_genre: Vec<MovieGenre>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Genre {
    pub id: i32,
    pub genre_name: String,
    #[serde(skip)]
    pub created_at: Timestamp,
    #[serde(skip)]
    pub updated_at: Timestamp,
}

/// Row of the `movies_genres` join table with the genre it points at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieGenre {
    #[serde(skip)]
    pub id: i32,
    #[serde(skip)]
    pub movie_id: i32,
    #[serde(skip)]
    pub genre_id: i32,
    pub genre: Genre,
    #[serde(skip)]
    pub created_at: Timestamp,
    #[serde(skip)]
    pub updated_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct AppStatus {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
}

/// Body of `POST /api/admin/editmovie`. Every field travels as a string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MoviePayload {
    pub id: String,
    pub title: String,
    pub description: String,
    pub year: String,
    pub release_date: String,
    pub run_time: String,
    pub rating: String,
    pub mpaa_rating: String,
}

impl MoviePayload {
    /// Builds the record to write, stamped with `now`.
    ///
    /// An empty `id` means a new movie. The wire `year` is ignored: the stored
    /// year always comes from `release_date`.
    pub fn into_movie(self, now: Timestamp) -> Result<Movie, PayloadError> {
        let id = match self.id.trim() {
            "" => 0,
            raw => parse_field("id", raw)?,
        };
        let release_date = parse_release_date(&self.release_date)?;
        let run_time = parse_field("run_time", &self.run_time)?;
        let rating = parse_field("rating", &self.rating)?;

        Ok(Movie {
            id,
            title: self.title,
            description: self.description,
            year: release_date.year(),
            release_date,
            run_time,
            rating,
            mpaa_rating: self.mpaa_rating,
            created_at: now,
            updated_at: now,
            movie_genre: Vec::new(),
        })
    }
}

/// Accepts exactly `YYYY-MM-DD`: no time part, no basic or signed-year forms.
fn parse_release_date(raw: &str) -> Result<Date, PayloadError> {
    let trimmed = raw.trim();
    let well_formed = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(PayloadError::invalid("release_date", raw));
    }
    Date::strptime("%Y-%m-%d", trimmed).map_err(|_| PayloadError::invalid("release_date", raw))
}

fn parse_field(field: &'static str, raw: &str) -> Result<i32, PayloadError> {
    raw.trim().parse().map_err(|_| PayloadError::invalid(field, raw))
}
