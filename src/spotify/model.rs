use serde::{Deserialize, Serialize};

// Spotify Web API的响应结构，只保留前端用到的字段

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpotifyProfile {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RawTrack {
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: Option<u64>,
    pub track_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct RawAlbumDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    pub tracks: Page<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub albums: Page<RawAlbum>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumsResponse {
    // 未知ID对应的元素是null
    pub albums: Vec<Option<RawAlbum>>,
}

#[derive(Debug, Serialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

impl From<RawAlbum> for AlbumSummary {
    fn from(raw: RawAlbum) -> Self {
        AlbumSummary {
            id: raw.id,
            name: raw.name,
            artists: raw.artists.into_iter().map(|a| a.name).collect(),
            images: raw.images,
            release_date: raw.release_date,
            total_tracks: raw.total_tracks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackSummary {
    pub id: Option<String>,
    pub name: String,
    pub duration_ms: Option<u64>,
    pub track_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AlbumDetail {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    pub tracks: Vec<TrackSummary>,
}

impl From<RawAlbumDetail> for AlbumDetail {
    fn from(raw: RawAlbumDetail) -> Self {
        AlbumDetail {
            id: raw.id,
            name: raw.name,
            artists: raw.artists.into_iter().map(|a| a.name).collect(),
            images: raw.images,
            release_date: raw.release_date,
            total_tracks: raw.total_tracks,
            tracks: raw
                .tracks
                .items
                .into_iter()
                .map(|t| TrackSummary {
                    id: t.id,
                    name: t.name,
                    duration_ms: t.duration_ms,
                    track_number: t.track_number,
                })
                .collect(),
        }
    }
}
