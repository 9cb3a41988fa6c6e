//! SOC ("Sonic Object Configuration") scripts describe levels, objects,
//! states and the like for SRB2Kart. A package usually ships many small SOC
//! fragments which together make up one logical configuration.
//!
//! The grammar is line oriented:
//!
//! ```text,ignore
//! # comment
//! Level GT                  <- block header: kind, then name
//! LevelName = Green Hills   <- property of the current block
//! Palette = 2
//!                           <- a blank line closes the block
//! Freeslot                  <- freeslot blocks list bare names
//! MT_KARTBANANA
//! ```
//!
//! Parsing is always done into an existing [`Soc`], so fragments fold one
//! after another: later fragments add new blocks and keys, and overwrite keys
//! that already exist.

use log::trace;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Key/value pairs of one block, keys lowercased
pub type Properties = BTreeMap<String, String>;

const FREESLOT: &str = "freeslot";
const MAINCFG: &str = "maincfg";
const LEVEL: &str = "level";

/// Highest map number that has an extended two character name (`ZZ`)
const MAX_MAP_NUMBER: u32 = 1035;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocErrorKind {
    #[error("property {0:?} is not inside a block")]
    PropertyOutsideBlock(String),
    #[error("{0} block has no name")]
    UnnamedBlock(String),
    #[error("{0:?} is not a level number or map id")]
    BadLevelName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{label}:{line}: {kind}")]
pub struct SocError {
    pub label: String,
    /// 1-based line in the fragment
    pub line: usize,
    pub kind: SocErrorKind,
}

/// The merged document: block kind -> block name -> properties
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Soc {
    blocks: BTreeMap<String, BTreeMap<String, Properties>>,
}

impl Soc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Case-insensitive block lookup
    pub fn block(&self, kind: &str, name: &str) -> Option<&Properties> {
        self.blocks
            .get(&kind.to_ascii_lowercase())?
            .get(&name.to_ascii_lowercase())
    }

    /// Look up a level by map id (`"gt"`, `"01"`) or number (`"1"`, `"100"`)
    pub fn level(&self, map: &str) -> Option<&Properties> {
        let id = normalise_map_id(map)?;
        self.blocks.get(LEVEL)?.get(&id)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn blocks(&self, kind: &str) -> impl Iterator<Item = (&str, &Properties)> {
        self.blocks
            .get(&kind.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .map(|(name, props)| (name.as_str(), props))
    }

    fn block_mut(&mut self, kind: &str, name: &str) -> &mut Properties {
        self.blocks
            .entry(kind.to_owned())
            .or_default()
            .entry(name.to_owned())
            .or_default()
    }
}

impl fmt::Display for Soc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, blocks) in &self.blocks {
            for (name, props) in blocks {
                if name.is_empty() {
                    writeln!(f, "{}", kind.to_ascii_uppercase())?;
                } else {
                    writeln!(
                        f,
                        "{} {}",
                        kind.to_ascii_uppercase(),
                        name.to_ascii_uppercase()
                    )?;
                }
                for (key, value) in props {
                    if kind == FREESLOT {
                        writeln!(f, "{}", key.to_ascii_uppercase())?;
                    } else {
                        writeln!(f, "{} = {}", key, value)?;
                    }
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Turn a level name into the lowercase two character map id used in lump
/// names (`MAP01`, `MAPGT`).
///
/// Numbers 1-99 are zero padded. 100-1035 use the extended scheme where
/// `100` is `A0` and each letter covers 36 maps (`0-9`, `A-Z`).
pub fn normalise_map_id(name: &str) -> Option<String> {
    let name = name.trim();
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
        let num: u32 = name.parse().ok()?;
        return match num {
            1..=99 => Some(format!("{:02}", num)),
            100..=MAX_MAP_NUMBER => {
                let x = num - 100;
                let p = (x / 36) as u8;
                let q = (x % 36) as u8;
                let second = if q < 10 { b'0' + q } else { b'a' + q - 10 };
                Some(String::from_utf8_lossy(&[b'a' + p, second]).into_owned())
            }
            _ => None,
        };
    }
    if name.len() == 2 && name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Some(name.to_ascii_lowercase());
    }
    None
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse one SOC fragment on top of `soc`. `label` names the source in
/// errors, usually the package file name.
pub fn parse_soc(label: &str, text: &str, mut soc: Soc) -> Result<Soc, SocError> {
    let error = |line: usize, kind: SocErrorKind| SocError {
        label: label.to_owned(),
        line: line + 1,
        kind,
    };

    let mut current: Option<(String, String)> = None;
    for (i, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            current = None;
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let Some((kind, name)) = &current else {
                return Err(error(
                    i,
                    SocErrorKind::PropertyOutsideBlock(key.trim().to_owned()),
                ));
            };
            soc.block_mut(kind, name)
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
            continue;
        }

        if let Some((kind, name)) = &current {
            if kind == FREESLOT {
                soc.block_mut(kind, name)
                    .insert(line.to_ascii_lowercase(), String::new());
                continue;
            }
        }

        let mut words = line.split_whitespace();
        let kind = words.next().unwrap_or_default().to_ascii_lowercase();
        let name = words.collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        if name.is_empty() && kind != FREESLOT && kind != MAINCFG {
            return Err(error(i, SocErrorKind::UnnamedBlock(kind)));
        }
        let name = if kind == LEVEL {
            normalise_map_id(&name).ok_or_else(|| error(i, SocErrorKind::BadLevelName(name)))?
        } else {
            name
        };

        trace!("{}: {} block {:?}", label, kind, name);
        soc.block_mut(&kind, &name);
        current = Some((kind, name));
    }
    Ok(soc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN_HILLS: &str = "\
# Green Hills Zone
Level GT
LevelName = Green Hills
Act = 0
Palette = 2

Level 1
LevelName = Sunbeam Paradise # trailing comment
";

    #[test]
    fn parse_levels() {
        let soc = parse_soc("test.pk3", GREEN_HILLS, Soc::new()).unwrap();

        let gt = soc.level("gt").unwrap();
        assert_eq!(gt["levelname"], "Green Hills");
        assert_eq!(gt["palette"], "2");

        let sp = soc.level("01").unwrap();
        assert_eq!(sp["levelname"], "Sunbeam Paradise");
        assert_eq!(soc.level("1"), Some(sp));
        assert_eq!(soc.block("LEVEL", "GT"), Some(gt));
    }

    #[test]
    fn map_ids() {
        assert_eq!(normalise_map_id("1").as_deref(), Some("01"));
        assert_eq!(normalise_map_id("99").as_deref(), Some("99"));
        assert_eq!(normalise_map_id("100").as_deref(), Some("a0"));
        assert_eq!(normalise_map_id("110").as_deref(), Some("aa"));
        assert_eq!(normalise_map_id("136").as_deref(), Some("b0"));
        assert_eq!(normalise_map_id("1035").as_deref(), Some("zz"));
        assert_eq!(normalise_map_id("GT").as_deref(), Some("gt"));
        assert_eq!(normalise_map_id("0"), None);
        assert_eq!(normalise_map_id("1036"), None);
        assert_eq!(normalise_map_id("GTX"), None);
    }

    #[test]
    fn later_fragments_override_and_extend() {
        let base = parse_soc("a", GREEN_HILLS, Soc::new()).unwrap();
        let soc = parse_soc(
            "b",
            "LEVEL gt\nPalette = 5\nMusic = GHZ\n\nObject MT_BANANA\nSpeed = 3\n",
            base,
        )
        .unwrap();

        let gt = soc.level("gt").unwrap();
        assert_eq!(gt["palette"], "5");
        assert_eq!(gt["music"], "GHZ");
        assert_eq!(gt["levelname"], "Green Hills");
        assert_eq!(soc.block("object", "mt_banana").unwrap()["speed"], "3");
    }

    #[test]
    fn adding_a_fragment_keeps_untouched_properties() {
        let a = "Level GT\nPalette = 2\n";
        let b = "Level GW\nLevelName = Green Woods\n";
        let c = "Level GY\nLevelName = Green Yards\n\nLevel GW\nAct = 1\n";

        let ab = [a, b]
            .iter()
            .try_fold(Soc::new(), |soc, f| parse_soc("x", f, soc))
            .unwrap();
        let abc = [a, b, c]
            .iter()
            .try_fold(Soc::new(), |soc, f| parse_soc("x", f, soc))
            .unwrap();

        for (kind_name, props) in ab.blocks("level") {
            let merged = abc.level(kind_name).unwrap();
            for (key, value) in props {
                assert_eq!(&merged[key], value);
            }
        }
        assert_eq!(abc.level("gw").unwrap()["act"], "1");
        assert!(abc.level("gy").is_some());
    }

    #[test]
    fn freeslots_collect_bare_names() {
        let soc = parse_soc("x", "FREESLOT\nMT_THING\nS_THING\n", Soc::new()).unwrap();
        let slots: Vec<&String> = soc.block("freeslot", "").unwrap().keys().collect();
        assert_eq!(slots, ["mt_thing", "s_thing"]);
    }

    #[test]
    fn crlf_and_case() {
        let soc = parse_soc("x", "LEVEL A0\r\nLEVELNAME = Extended\r\n", Soc::new()).unwrap();
        assert_eq!(soc.level("100").unwrap()["levelname"], "Extended");
    }

    #[test]
    fn property_outside_block() {
        let err = parse_soc("kart.wad", "Level 1\nAct = 1\n\nPalette = 3\n", Soc::new())
            .unwrap_err();
        assert_eq!(err.label, "kart.wad");
        assert_eq!(err.line, 4);
        assert_eq!(
            err.kind,
            SocErrorKind::PropertyOutsideBlock("Palette".to_owned())
        );
    }

    #[test]
    fn unnamed_and_bad_level_headers() {
        let err = parse_soc("x", "Object\nSpeed = 1\n", Soc::new()).unwrap_err();
        assert_eq!(err.kind, SocErrorKind::UnnamedBlock("object".to_owned()));

        let err = parse_soc("x", "Level 5000\n", Soc::new()).unwrap_err();
        assert_eq!(err.kind, SocErrorKind::BadLevelName("5000".to_owned()));
    }

    #[test]
    fn display_reparses_to_same_document() {
        let soc = parse_soc(
            "x",
            "Freeslot\nMT_A\n\nLevel GT\nPalette = 2\n\nObject MT_A\nSpeed = 3\n",
            Soc::new(),
        )
        .unwrap();
        let text = soc.to_string();
        let again = parse_soc("y", &text, Soc::new()).unwrap();
        assert_eq!(soc, again);
    }
}
