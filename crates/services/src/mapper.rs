//! # Entity/DTO Mapper
//!
//! Pure conversions between persisted entity graphs and wire DTOs.

use domains::{DomainError, Game, GameAggregate, GameFilter, Genre, NewGame, Result};

use crate::dto::{CommentDto, DeveloperDto, GameDto, GameFilterDto, GameUploadDto};

pub fn game_to_dto(aggregate: GameAggregate) -> GameDto {
    let GameAggregate {
        game,
        developer,
        images,
        videos,
        ratings,
        comments,
    } = aggregate;

    let rating_count = ratings.len();
    let average_rating = (rating_count > 0)
        .then(|| ratings.iter().map(|r| f64::from(r.score)).sum::<f64>() / rating_count as f64);

    GameDto {
        id: game.id,
        name: game.name,
        price: game.price,
        genre: game.genre,
        developer: developer.map(|d| DeveloperDto {
            id: d.id,
            name: d.name,
        }),
        images: images.into_iter().map(|i| i.path).collect(),
        videos: videos.into_iter().map(|v| v.path).collect(),
        average_rating,
        rating_count,
        comments: comments
            .into_iter()
            .map(|c| CommentDto {
                user_id: c.user_id,
                text: c.text,
                created_at: c.created_at,
            })
            .collect(),
    }
}

pub fn games_to_dtos(aggregates: Vec<GameAggregate>) -> Vec<GameDto> {
    aggregates.into_iter().map(game_to_dto).collect()
}

pub fn parse_genre(field: &str) -> Result<Genre> {
    field.parse()
}

/// Converts the upload DTO into an insertable game. Duplicate genres collapse
/// into one; blank trailer and image paths are dropped.
pub fn upload_to_new_game(dto: GameUploadDto) -> Result<NewGame> {
    let name = validate_listing(&dto.name, dto.price)?;

    let mut genre: Vec<Genre> = Vec::new();
    for raw in dto.genre.names() {
        let parsed = parse_genre(raw)?;
        if !genre.contains(&parsed) {
            genre.push(parsed);
        }
    }

    Ok(NewGame {
        name,
        price: dto.price,
        genre,
        developer_id: dto.developer_id,
        trailer_url: dto
            .trailer_url
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        image_paths: dto
            .images
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
    })
}

/// Checks a full replacement body the same way an upload is checked and trims
/// the name.
pub fn replacement_game(game: Game) -> Result<Game> {
    let name = validate_listing(&game.name, game.price)?;
    Ok(Game { name, ..game })
}

/// Name and price rules shared by create and replace. Returns the trimmed name.
fn validate_listing(name: &str, price: f64) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid("game name must not be empty"));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::invalid("game price must be a non-negative number"));
    }
    Ok(name.to_string())
}

pub fn filter_from_dto(dto: &GameFilterDto) -> Result<GameFilter> {
    let genre = match dto.genre.trim() {
        "" => None,
        raw => Some(parse_genre(raw)?),
    };
    Ok(GameFilter::new(Some(&dto.name), Some(dto.price), genre))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::GenreField;
    use chrono::Utc;
    use domains::{Comment, Developer, Image, Rating, Video};

    fn upload() -> GameUploadDto {
        GameUploadDto {
            name: "  Stardew Valley ".into(),
            price: 14.99,
            genre: GenreField::One("Simulation, rpg, simulation".into()),
            developer_id: 3,
            trailer_url: Some("https://videos.example/stardew.mp4".into()),
            images: vec!["cover.png".into(), "  ".into()],
        }
    }

    #[test]
    fn upload_maps_to_new_game() {
        let game = upload_to_new_game(upload()).unwrap();
        assert_eq!(game.name, "Stardew Valley");
        assert_eq!(game.genre, vec![Genre::Simulation, Genre::Rpg]);
        assert_eq!(game.trailer_url.as_deref(), Some("https://videos.example/stardew.mp4"));
        assert_eq!(game.image_paths, vec!["cover.png".to_string()]);
    }

    #[test]
    fn upload_rejects_unknown_genre_and_bad_fields() {
        let mut dto = upload();
        dto.genre = GenreField::Many(vec!["Action".into(), "Opera".into()]);
        assert_eq!(
            upload_to_new_game(dto).unwrap_err(),
            DomainError::InvalidGenre("Opera".into())
        );

        let mut dto = upload();
        dto.name = " ".into();
        assert!(matches!(upload_to_new_game(dto), Err(DomainError::InvalidRequest(_))));

        let mut dto = upload();
        dto.price = -1.0;
        assert!(matches!(upload_to_new_game(dto), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn replacement_follows_upload_rules() {
        let game = Game {
            id: 5,
            name: "  Celeste ".into(),
            price: 19.99,
            genre: vec![Genre::Platformer],
            developer_id: 2,
        };
        assert_eq!(replacement_game(game.clone()).unwrap().name, "Celeste");

        let blank = Game { name: "   ".into(), ..game.clone() };
        assert!(matches!(replacement_game(blank), Err(DomainError::InvalidRequest(_))));

        let negative = Game { price: -50.0, ..game.clone() };
        assert!(matches!(replacement_game(negative), Err(DomainError::InvalidRequest(_))));

        let nan = Game { price: f64::NAN, ..game };
        assert!(matches!(replacement_game(nan), Err(DomainError::InvalidRequest(_))));
    }

    #[test]
    fn aggregate_flattens_into_dto() {
        let now = Utc::now();
        let aggregate = GameAggregate {
            game: Game {
                id: 9,
                name: "Hades".into(),
                price: 24.5,
                genre: vec![Genre::Action],
                developer_id: 4,
            },
            developer: Some(Developer {
                id: 4,
                name: "Supergiant".into(),
                email: Some("hi@supergiant.example".into()),
            }),
            images: vec![Image { id: 1, game_id: 9, path: "a.png".into() }],
            videos: vec![Video { id: 2, game_id: 9, path: "t.mp4".into() }],
            ratings: vec![
                Rating { id: 1, game_id: 9, user_id: 1, score: 4 },
                Rating { id: 2, game_id: 9, user_id: 2, score: 5 },
            ],
            comments: vec![Comment {
                id: 1,
                game_id: 9,
                user_id: 2,
                text: "great".into(),
                created_at: now,
            }],
        };

        let dto = game_to_dto(aggregate);
        assert_eq!(dto.developer, Some(DeveloperDto { id: 4, name: "Supergiant".into() }));
        assert_eq!(dto.images, vec!["a.png"]);
        assert_eq!(dto.videos, vec!["t.mp4"]);
        assert_eq!(dto.rating_count, 2);
        assert_eq!(dto.average_rating, Some(4.5));
        assert_eq!(dto.comments[0].text, "great");
    }

    #[test]
    fn unrated_game_has_no_average() {
        let dto = game_to_dto(GameAggregate::bare(Game {
            id: 1,
            name: "x".into(),
            price: 1.0,
            genre: vec![],
            developer_id: 1,
        }));
        assert_eq!(dto.average_rating, None);
        assert_eq!(dto.rating_count, 0);
    }

    #[test]
    fn empty_filter_dto_is_a_no_op() {
        let filter = filter_from_dto(&GameFilterDto::default()).unwrap();
        assert!(filter.is_empty());

        let filter = filter_from_dto(&GameFilterDto {
            name: "Zel".into(),
            price: 30.0,
            genre: " adventure ".into(),
        })
        .unwrap();
        assert_eq!(filter.name.as_deref(), Some("zel"));
        assert_eq!(filter.max_price, Some(30.0));
        assert_eq!(filter.genre, Some(Genre::Adventure));
    }

    #[test]
    fn filter_with_unknown_genre_fails() {
        let dto = GameFilterDto {
            genre: "jazz".into(),
            ..GameFilterDto::default()
        };
        assert!(matches!(filter_from_dto(&dto), Err(DomainError::InvalidGenre(_))));
    }
}
