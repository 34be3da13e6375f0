//! HTTP Digest access authentication (RFC 2617, MD5 and `qop=auth`).
//!
//! Some cameras guard the device service with HTTP Digest instead of, or on top of,
//! WS-Security. The server's `WWW-Authenticate` challenge is parsed here and answered with
//! an `Authorization` header value.

use std::fmt::Write;

/// Parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Whether the server offered `qop=auth`. Without it the RFC 2069 response is used.
    pub qop_auth: bool,
}

impl DigestChallenge {
    /// Parses a `WWW-Authenticate` header value. Returns `None` for other schemes and for
    /// algorithms other than MD5.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_auth = false;

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => {
                    qop_auth = value.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth"));
                }
                "algorithm" if !value.eq_ignore_ascii_case("md5") => return None,
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            nonce: nonce?,
            opaque,
            qop_auth,
        })
    }

    /// `Authorization` header value with a fresh client nonce.
    pub fn authorization(&self, username: &str, password: &str, method: &str, uri: &str) -> String {
        let cnonce = format!("{:016x}", rand::random::<u64>());
        self.authorization_with(username, password, method, uri, &cnonce, 1)
    }

    pub fn authorization_with(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
        nonce_count: u32,
    ) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nc = format!("{nonce_count:08x}");

        let response = if self.qop_auth {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}", response="{response}", algorithm=MD5"#,
            self.realm, self.nonce
        );
        if self.qop_auth {
            let _ = write!(header, r#", qop=auth, nc={nc}, cnonce="{cnonce}""#);
        }
        if let Some(opaque) = &self.opaque {
            let _ = write!(header, r#", opaque="{opaque}""#);
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Splits `key=value, key="quoted, value"` pairs. Commas inside quotes do not split.
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_string();
        let after = after.trim_start();

        let (value, tail) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, tail)) => (value.to_string(), tail),
                None => (quoted.to_string(), ""),
            },
            None => match after.split_once(',') {
                Some((value, tail)) => (value.trim().to_string(), tail),
                None => (after.trim().to_string(), ""),
            },
        };

        pairs.push((key, value));
        rest = tail.trim_start().trim_start_matches(',').trim_start();
    }
    pairs
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
