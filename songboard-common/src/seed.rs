//! Demo catalogue loaded with `--seed-demo`

use crate::song::{thumbnail_url, watch_url, NewSong, SongStatus, VideoFields, DEFAULT_ARTIST};

/// (title, youtube_id, views)
const DEMO_SONGS: &[(&str, &str, i64)] = &[
    ("O Mineiro e o Italiano", "s9kVG2ZaTS4", 5_200_000),
    ("Pagode em Brasília", "lpGGNA6_920", 5_000_000),
    ("Terra Roxa", "4Nb89GFu2g4", 3_300_000),
    ("Tristeza do Jeca", "tRQ2PWlCcZk", 154_000),
    ("Rio de Lágrimas", "FxXXvPL3JIg", 153_000),
    ("Rei do Gado", "8cqJ8XMqGQs", 1_250_000),
    ("Chico Mineiro", "YQHsXMglC9A", 980_000),
    ("Carro de Boi", "a1B2c3D4E5F", 875_000),
    ("Tropeiro Velho", "f6G7h8I9J0K", 720_000),
    ("Cabocla Teresa", "L1M2N3O4P5Q", 650_000),
];

/// Approved demo songs with fixed view counts
pub fn demo_songs() -> Vec<NewSong> {
    DEMO_SONGS
        .iter()
        .map(|(title, youtube_id, views)| NewSong {
            title: (*title).to_string(),
            artist: DEFAULT_ARTIST.to_string(),
            video: VideoFields {
                youtube_url: watch_url(youtube_id),
                youtube_id: (*youtube_id).to_string(),
                thumbnail: thumbnail_url(youtube_id),
                views: *views,
            },
            status: SongStatus::Approved,
        })
        .collect()
}
