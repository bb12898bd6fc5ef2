use std::{collections::HashMap, future::Future, time::Duration};

use jiff::{Timestamp, civil::Date};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Query,
};
use tracing::debug;

use crate::{
    entities::{genre, movie, movie_genre},
    error::{RepoError, RepoResult},
    models::{Genre, Movie, MovieGenre},
};

/// Data access for the movie catalog. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
    timeout: Duration,
}

impl Repository {
    pub fn new(db: DatabaseConnection, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    #[cfg(test)]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn get_movie(&self, id: i32) -> RepoResult<Movie> {
        self.bounded("get_movie", async {
            let Some(row) = movie::Entity::find_by_id(id).one(&self.db).await? else {
                return Err(RepoError::NotFound { entity: "movie", id });
            };

            let mut movie = movie_from_row(row)?;
            movie.movie_genre = self.load_genres(&[id]).await?.remove(&id).unwrap_or_default();
            Ok(movie)
        })
        .await
    }

    /// All movies ordered by title, optionally only those tagged with `genre_id`.
    pub async fn get_all_movies(&self, genre_id: Option<i32>) -> RepoResult<Vec<Movie>> {
        self.bounded("get_all_movies", async {
            let mut select = movie::Entity::find();
            if let Some(genre_id) = genre_id {
                select = select.filter(
                    movie::Column::Id.in_subquery(
                        Query::select()
                            .column(movie_genre::Column::MovieId)
                            .from(movie_genre::Entity)
                            .and_where(movie_genre::Column::GenreId.eq(genre_id))
                            .to_owned(),
                    ),
                );
            }

            let rows = select.order_by_asc(movie::Column::Title).all(&self.db).await?;
            debug!(genre_id = ?genre_id, count = rows.len(), "loaded movies");

            let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
            let mut genres = self.load_genres(&ids).await?;

            rows.into_iter()
                .map(|row| {
                    let mut movie = movie_from_row(row)?;
                    movie.movie_genre = genres.remove(&movie.id).unwrap_or_default();
                    Ok(movie)
                })
                .collect::<RepoResult<Vec<_>>>()
        })
        .await
    }

    /// Inserts `movie` and returns the id the store assigned. `movie.id` is ignored.
    pub async fn create_movie(&self, movie: &Movie) -> RepoResult<i32> {
        self.bounded("create_movie", async {
            let model = movie::ActiveModel {
                id: Default::default(),
                title: Set(movie.title.clone()),
                description: Set(movie.description.clone()),
                year: Set(movie.year.into()),
                release_date: Set(movie.release_date.to_string()),
                runtime: Set(movie.run_time),
                rating: Set(movie.rating),
                mpaa_rating: Set(movie.mpaa_rating.clone()),
                created_at: Set(movie.created_at.as_second()),
                updated_at: Set(movie.updated_at.as_second()),
            };

            let id = movie::Entity::insert(model).exec(&self.db).await?.last_insert_id;
            debug!(id, title = %movie.title, "created movie");
            Ok(id)
        })
        .await
    }

    /// Overwrites every mutable column of the movie with `movie.id`; `created_at` is kept.
    pub async fn update_movie(&self, movie: &Movie) -> RepoResult<()> {
        self.bounded("update_movie", async {
            let model = movie::ActiveModel {
                id: Default::default(),
                title: Set(movie.title.clone()),
                description: Set(movie.description.clone()),
                year: Set(movie.year.into()),
                release_date: Set(movie.release_date.to_string()),
                runtime: Set(movie.run_time),
                rating: Set(movie.rating),
                mpaa_rating: Set(movie.mpaa_rating.clone()),
                created_at: Default::default(),
                updated_at: Set(movie.updated_at.as_second()),
            };

            let result = movie::Entity::update_many()
                .set(model)
                .filter(movie::Column::Id.eq(movie.id))
                .exec(&self.db)
                .await?;

            if result.rows_affected == 0 {
                return Err(RepoError::NotFound { entity: "movie", id: movie.id });
            }
            debug!(id = movie.id, "updated movie");
            Ok(())
        })
        .await
    }

    pub async fn delete_movie(&self, id: Option<i32>) -> RepoResult<()> {
        debug!(id = ?id, "delete requested");
        Err(RepoError::NotImplemented("delete_movie"))
    }

    pub async fn search_movie(&self, term: &str) -> RepoResult<Vec<Movie>> {
        debug!(term, "search requested");
        Err(RepoError::NotImplemented("search_movie"))
    }

    pub async fn get_all_genres(&self) -> RepoResult<Vec<Genre>> {
        self.bounded("get_all_genres", async {
            genre::Entity::find()
                .order_by_asc(genre::Column::GenreName)
                .all(&self.db)
                .await?
                .into_iter()
                .map(genre_from_row)
                .collect::<RepoResult<Vec<_>>>()
        })
        .await
    }

    /// Genre links for `movie_ids`, keyed by movie, in join-table order.
    async fn load_genres(&self, movie_ids: &[i32]) -> RepoResult<HashMap<i32, Vec<MovieGenre>>> {
        let mut by_movie: HashMap<i32, Vec<MovieGenre>> = HashMap::new();
        if movie_ids.is_empty() {
            return Ok(by_movie);
        }

        let rows = movie_genre::Entity::find()
            .filter(movie_genre::Column::MovieId.is_in(movie_ids.iter().copied()))
            .find_also_related(genre::Entity)
            .order_by_asc(movie_genre::Column::Id)
            .all(&self.db)
            .await?;

        for (link, genre) in rows {
            // Dangling links are skipped, as an inner join would.
            let Some(genre) = genre else {
                continue;
            };
            by_movie.entry(link.movie_id).or_default().push(MovieGenre {
                id: link.id,
                movie_id: link.movie_id,
                genre_id: link.genre_id,
                genre: genre_from_row(genre)?,
                created_at: timestamp("movies_genres.created_at", link.created_at)?,
                updated_at: timestamp("movies_genres.updated_at", link.updated_at)?,
            });
        }

        Ok(by_movie)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> RepoResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepoError::Timeout { op, timeout: self.timeout }),
        }
    }
}

fn movie_from_row(row: movie::Model) -> RepoResult<Movie> {
    let release_date: Date = row.release_date.parse().map_err(|e: jiff::Error| {
        RepoError::InvalidRow { column: "movies.release_date", reason: e.to_string() }
    })?;
    let year = i16::try_from(row.year).map_err(|e| RepoError::InvalidRow {
        column: "movies.year",
        reason: e.to_string(),
    })?;

    Ok(Movie {
        id: row.id,
        title: row.title,
        description: row.description,
        year,
        release_date,
        run_time: row.runtime,
        rating: row.rating,
        mpaa_rating: row.mpaa_rating,
        created_at: timestamp("movies.created_at", row.created_at)?,
        updated_at: timestamp("movies.updated_at", row.updated_at)?,
        movie_genre: Vec::new(),
    })
}

fn genre_from_row(row: genre::Model) -> RepoResult<Genre> {
    Ok(Genre {
        id: row.id,
        genre_name: row.genre_name,
        created_at: timestamp("genres.created_at", row.created_at)?,
        updated_at: timestamp("genres.updated_at", row.updated_at)?,
    })
}

fn timestamp(column: &'static str, seconds: i64) -> RepoResult<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|e| RepoError::InvalidRow { column, reason: e.to_string() })
}

#[cfg(test)]
pub(crate) mod tests {
    use sea_orm::{ActiveModelTrait, TransactionTrait};

    use super::*;

    pub(crate) async fn test_repo() -> Repository {
        let db = crate::db::connect_and_migrate("sqlite::memory:", 1).await.unwrap();
        Repository::new(db, Duration::from_secs(3))
    }

    pub(crate) async fn link_genre(repo: &Repository, movie_id: i32, genre_id: i32) {
        movie_genre::ActiveModel {
            id: Default::default(),
            movie_id: Set(movie_id),
            genre_id: Set(genre_id),
            created_at: Set(0),
            updated_at: Set(0),
        }
        .insert(repo.db())
        .await
        .unwrap();
    }

    pub(crate) async fn genre_id(repo: &Repository, name: &str) -> i32 {
        repo.get_all_genres()
            .await
            .unwrap()
            .into_iter()
            .find(|g| g.genre_name == name)
            .map(|g| g.id)
            .unwrap()
    }

    pub(crate) fn sample_movie(title: &str, release_date: Date) -> Movie {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        Movie {
            id: 0,
            title: title.to_string(),
            description: format!("{title} description"),
            year: release_date.year(),
            release_date,
            run_time: 120,
            rating: 4,
            mpaa_rating: "PG-13".to_string(),
            created_at: now,
            updated_at: now,
            movie_genre: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let repo = test_repo().await;
        let movie = sample_movie("The Godfather", jiff::civil::date(1972, 3, 24));

        let id = repo.create_movie(&movie).await.unwrap();
        assert!(id > 0);

        let stored = repo.get_movie(id).await.unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.title, movie.title);
        assert_eq!(stored.description, movie.description);
        assert_eq!(stored.run_time, movie.run_time);
        assert_eq!(stored.rating, movie.rating);
        assert_eq!(stored.mpaa_rating, movie.mpaa_rating);
        assert_eq!(stored.year, stored.release_date.year());
        assert_eq!(stored.year, 1972);
        assert_eq!(stored.created_at, movie.created_at);
    }

    #[tokio::test]
    async fn get_movie_attaches_genres_in_link_order() {
        let repo = test_repo().await;
        let id = repo.create_movie(&sample_movie("Heat", jiff::civil::date(1995, 12, 15))).await.unwrap();
        let crime = genre_id(&repo, "Crime").await;
        let drama = genre_id(&repo, "Drama").await;
        link_genre(&repo, id, crime).await;
        link_genre(&repo, id, drama).await;

        let movie = repo.get_movie(id).await.unwrap();
        let names: Vec<_> = movie.movie_genre.iter().map(|mg| mg.genre.genre_name.as_str()).collect();
        assert_eq!(names, ["Crime", "Drama"]);
        assert!(movie.movie_genre.iter().all(|mg| mg.movie_id == id));
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let repo = test_repo().await;
        let err = repo.get_movie(42).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound { entity: "movie", id: 42 }));
    }

    #[tokio::test]
    async fn all_movies_are_ordered_by_title() {
        let repo = test_repo().await;
        for title in ["Vertigo", "Alien", "Memento"] {
            repo.create_movie(&sample_movie(title, jiff::civil::date(2000, 1, 1))).await.unwrap();
        }

        let titles: Vec<_> =
            repo.get_all_movies(None).await.unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, ["Alien", "Memento", "Vertigo"]);
    }

    #[tokio::test]
    async fn genre_filter_restricts_movies() {
        let repo = test_repo().await;
        let alien = repo.create_movie(&sample_movie("Alien", jiff::civil::date(1979, 5, 25))).await.unwrap();
        let heat = repo.create_movie(&sample_movie("Heat", jiff::civil::date(1995, 12, 15))).await.unwrap();
        let scifi = genre_id(&repo, "Sci-Fi").await;
        let crime = genre_id(&repo, "Crime").await;
        link_genre(&repo, alien, scifi).await;
        link_genre(&repo, heat, crime).await;

        let movies = repo.get_all_movies(Some(scifi)).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, alien);
        assert_eq!(movies[0].movie_genre[0].genre.genre_name, "Sci-Fi");
    }

    #[tokio::test]
    async fn genre_without_movies_yields_empty_list() {
        let repo = test_repo().await;
        repo.create_movie(&sample_movie("Alien", jiff::civil::date(1979, 5, 25))).await.unwrap();
        let comedy = genre_id(&repo, "Comedy").await;

        assert!(repo.get_all_movies(Some(comedy)).await.unwrap().is_empty());
        assert!(repo.get_all_movies(Some(-1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_row_in_place() {
        let repo = test_repo().await;
        let original = sample_movie("Alien", jiff::civil::date(1979, 5, 25));
        let id = repo.create_movie(&original).await.unwrap();

        let release_date = jiff::civil::date(1986, 7, 18);
        let changed = Movie {
            id,
            title: "Aliens".to_string(),
            release_date,
            year: release_date.year(),
            rating: 5,
            updated_at: Timestamp::from_second(1_800_000_000).unwrap(),
            ..original.clone()
        };
        repo.update_movie(&changed).await.unwrap();

        let stored = repo.get_movie(id).await.unwrap();
        assert_eq!(stored.title, "Aliens");
        assert_eq!(stored.year, 1986);
        assert_eq!(stored.rating, 5);
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.updated_at, changed.updated_at);
        assert_eq!(repo.get_all_movies(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found_and_inserts_nothing() {
        let repo = test_repo().await;
        let movie = Movie { id: 77, ..sample_movie("Ghost", jiff::civil::date(1990, 7, 13)) };

        let err = repo.update_movie(&movie).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound { id: 77, .. }));
        assert!(repo.get_all_movies(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn genres_are_ordered_by_name() {
        let repo = test_repo().await;
        let names: Vec<_> =
            repo.get_all_genres().await.unwrap().into_iter().map(|g| g.genre_name).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert!(!names.is_empty());
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn delete_and_search_are_not_implemented() {
        let repo = test_repo().await;
        assert!(matches!(
            repo.delete_movie(Some(1)).await,
            Err(RepoError::NotImplemented("delete_movie"))
        ));
        assert!(matches!(repo.delete_movie(None).await, Err(RepoError::NotImplemented(_))));
        assert!(matches!(
            repo.search_movie("alien").await,
            Err(RepoError::NotImplemented("search_movie"))
        ));
    }

    #[tokio::test]
    async fn slow_calls_fail_with_timeout() {
        let db = crate::db::connect_and_migrate("sqlite::memory:", 1).await.unwrap();
        let repo = Repository::new(db, Duration::from_millis(10));

        let err = repo
            .bounded("stalled", std::future::pending::<RepoResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Timeout { op: "stalled", .. }));
    }

    #[tokio::test]
    async fn operations_waiting_on_the_pool_time_out() {
        let repo = test_repo().await;
        let bounded = Repository::new(repo.db().clone(), Duration::from_millis(50));

        // The pool has a single connection; holding it open stalls every query.
        let txn = repo.db().begin().await.unwrap();

        let err = bounded.get_all_genres().await.unwrap_err();
        assert!(matches!(err, RepoError::Timeout { op: "get_all_genres", .. }));

        let err = bounded
            .create_movie(&sample_movie("Heat", jiff::civil::date(1995, 12, 15)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Timeout { op: "create_movie", .. }));

        txn.rollback().await.unwrap();
        assert!(repo.get_all_movies(None).await.unwrap().is_empty());
    }
}
