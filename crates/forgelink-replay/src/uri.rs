//! Live-replay invitation URIs.
//!
//! The lobby hands out invitations as
//! `faflive://<host>/<gameUid>/<playerUid>.scfareplay?mod=<m>&map=<enc>`.
//! The game process only understands the `gpgnet` scheme, so the URI is
//! rewritten verbatim apart from the scheme, with the mod and the decoded
//! map name carried separately.

use crate::error::ReplayError;

/// A parsed `faflive://` invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveReplayUri {
    /// Host (and optional port) of the live replay server.
    pub host: String,
    pub game_id: u64,
    pub player_id: u64,
    /// `mod` query parameter, decoded.
    pub mod_name: Option<String>,
    /// `map` query parameter, decoded.
    pub map_name: Option<String>,
}

impl LiveReplayUri {
    pub fn parse(uri: &str) -> Result<Self, ReplayError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| ReplayError::Format(format!("`{uri}` is not a URI")))?;
        if !scheme.eq_ignore_ascii_case("faflive") {
            return Err(ReplayError::Format(format!(
                "expected a faflive URI, got scheme `{scheme}`"
            )));
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        let segments: Vec<&str> = path.split('/').collect();
        let [host, game, player_file] = segments.as_slice() else {
            return Err(ReplayError::IllegalPath(format!(
                "expected <host>/<game>/<player>.scfareplay, got `{path}`"
            )));
        };
        if host.is_empty() {
            return Err(ReplayError::IllegalPath(format!("`{path}` has no host")));
        }
        let player = player_file
            .strip_suffix(".scfareplay")
            .or_else(|| player_file.strip_suffix(".SCFAReplay"))
            .ok_or_else(|| {
                ReplayError::IllegalPath(format!(
                    "live replay path must end in .scfareplay, got `{player_file}`"
                ))
            })?;

        let game_id = game
            .parse()
            .map_err(|_| ReplayError::Parse(format!("bad game id `{game}`")))?;
        let player_id = player
            .parse()
            .map_err(|_| ReplayError::Parse(format!("bad player id `{player}`")))?;

        let mut mod_name = None;
        let mut map_name = None;
        for pair in query.unwrap_or_default().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mod" => mod_name = Some(percent_decode(value)?),
                "map" => map_name = Some(percent_decode(value)?),
                _ => {}
            }
        }

        Ok(Self {
            host: host.to_string(),
            game_id,
            player_id,
            mod_name,
            map_name,
        })
    }

    /// The rewritten URI handed to the game process.
    pub fn launch_uri(&self) -> String {
        format!(
            "gpgnet://{}/{}/{}.scfareplay",
            self.host, self.game_id, self.player_id
        )
    }
}

/// Decodes `%XX` escapes and `+` as space.
fn percent_decode(input: &str) -> Result<String, ReplayError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .ok_or_else(|| {
                        ReplayError::Format(format!("truncated percent escape in `{input}`"))
                    })?;
                let value = u8::from_str_radix(hex, 16).map_err(|_| {
                    ReplayError::Format(format!("bad percent escape `%{hex}` in `{input}`"))
                })?;
                out.push(value);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(out)
        .map_err(|_| ReplayError::Format(format!("`{input}` does not decode to UTF-8")))
}
