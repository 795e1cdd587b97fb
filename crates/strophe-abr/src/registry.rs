#![forbid(unsafe_code)]

use std::collections::HashMap;

use strophe_events::{LevelDescriptor, LevelInfo, PlaylistDetails};
use url::Url;

use crate::error::{LevelError, LevelResult};

/// Source of bitrate information for level selection.
///
/// Abstracts the selector from the concrete level storage.
pub trait BitrateLadder {
    /// Returns the total number of levels.
    fn level_count(&self) -> usize;

    /// Returns the bitrate (bits per second) of the level at `index`.
    ///
    /// Returns `None` if the index is out of bounds.
    fn level_bitrate(&self, index: usize) -> Option<u64>;
}

/// One distinct encoding of the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    bitrate: u64,
    urls: Vec<Url>,
    url_id: usize,
    details: Option<PlaylistDetails>,
    name: Option<String>,
    codecs: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl Level {
    fn from_descriptor(descriptor: LevelDescriptor) -> Self {
        Self {
            bitrate: descriptor.bitrate,
            urls: vec![descriptor.url],
            url_id: 0,
            details: None,
            name: descriptor.name,
            codecs: descriptor.codecs,
            width: descriptor.width,
            height: descriptor.height,
        }
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    /// Redundant URLs in manifest order. Never empty.
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Index of the redundant URL currently in use.
    pub fn url_id(&self) -> usize {
        self.url_id
    }

    pub fn active_url(&self) -> &Url {
        &self.urls[self.url_id]
    }

    pub fn details(&self) -> Option<&PlaylistDetails> {
        self.details.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.details.is_some_and(|d| d.live)
    }

    /// A playlist load is required before fragments of this level can be fetched.
    pub fn needs_reload(&self) -> bool {
        self.details.is_none_or(|d| d.live)
    }

    pub fn has_redundant_url(&self) -> bool {
        self.url_id + 1 < self.urls.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn codecs(&self) -> Option<&str> {
        self.codecs.as_deref()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }

    pub(crate) fn set_details(&mut self, details: PlaylistDetails) {
        self.details = Some(details);
    }

    /// Move to the next redundant URL and drop cached playlist details.
    ///
    /// Returns the new URL index, or `None` when every URL has been tried.
    pub(crate) fn advance_url(&mut self) -> Option<usize> {
        if !self.has_redundant_url() {
            return None;
        }
        self.url_id += 1;
        self.details = None;
        Some(self.url_id)
    }

    fn info(&self, index: usize) -> LevelInfo {
        LevelInfo {
            index,
            bitrate: self.bitrate,
            urls: self.urls.clone(),
            name: self.name.clone(),
            codecs: self.codecs.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Deduplicated levels, ascending by bitrate. Index 0 is the recovery floor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelSet {
    levels: Vec<Level>,
}

impl LevelSet {
    /// Build the level set from raw manifest descriptors.
    ///
    /// Descriptors sharing a bitrate become redundant URLs of one level.
    /// Returns the set and the index of the level whose bitrate matches the
    /// first descriptor, i.e. the default quality as authored.
    pub fn build(raw: Vec<LevelDescriptor>) -> LevelResult<(Self, usize)> {
        let first_bitrate = raw.first().ok_or(LevelError::EmptyManifest)?.bitrate;

        let mut by_bitrate: HashMap<u64, usize> = HashMap::with_capacity(raw.len());
        let mut levels: Vec<Level> = Vec::with_capacity(raw.len());
        for descriptor in raw {
            if let Some(&idx) = by_bitrate.get(&descriptor.bitrate) {
                levels[idx].urls.push(descriptor.url);
            } else {
                by_bitrate.insert(descriptor.bitrate, levels.len());
                levels.push(Level::from_descriptor(descriptor));
            }
        }

        levels.sort_by_key(|l| l.bitrate);

        let first_level = levels
            .iter()
            .position(|l| l.bitrate == first_bitrate)
            .unwrap_or_default();

        Ok((Self { levels }, first_level))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Level> {
        self.levels.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Level> {
        self.levels.iter()
    }

    pub fn as_slice(&self) -> &[Level] {
        &self.levels
    }

    /// Snapshot of every level for publishing.
    pub fn infos(&self) -> Vec<LevelInfo> {
        self.levels
            .iter()
            .enumerate()
            .map(|(index, level)| level.info(index))
            .collect()
    }
}

impl<'a> IntoIterator for &'a LevelSet {
    type Item = &'a Level;
    type IntoIter = std::slice::Iter<'a, Level>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}

impl BitrateLadder for LevelSet {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_bitrate(&self, index: usize) -> Option<u64> {
        self.levels.get(index).map(Level::bitrate)
    }
}

impl BitrateLadder for [u64] {
    fn level_count(&self) -> usize {
        self.len()
    }

    fn level_bitrate(&self, index: usize) -> Option<u64> {
        self.get(index).copied()
    }
}

impl BitrateLadder for Vec<u64> {
    fn level_count(&self) -> usize {
        self.as_slice().level_count()
    }

    fn level_bitrate(&self, index: usize) -> Option<u64> {
        self.as_slice().level_bitrate(index)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    fn descriptor(bitrate: u64, host: &str) -> LevelDescriptor {
        let url = Url::parse(&format!("https://{host}/{bitrate}.m3u8")).unwrap();
        LevelDescriptor::new(bitrate, url)
    }

    fn bitrates(set: &LevelSet) -> Vec<u64> {
        set.iter().map(Level::bitrate).collect()
    }

    #[test]
    fn empty_manifest_is_rejected() {
        assert_eq!(LevelSet::build(Vec::new()), Err(LevelError::EmptyManifest));
    }

    #[rstest]
    #[case(vec![1000, 200, 500], vec![200, 500, 1000], 2)]
    #[case(vec![200, 500, 1000], vec![200, 500, 1000], 0)]
    #[case(vec![500, 1000, 200], vec![200, 500, 1000], 1)]
    #[case(vec![800], vec![800], 0)]
    fn sorted_ascending_with_first_level_as_authored(
        #[case] input: Vec<u64>,
        #[case] expected: Vec<u64>,
        #[case] expected_first: usize,
    ) {
        let raw = input.into_iter().map(|b| descriptor(b, "cdn-a")).collect();
        let (set, first_level) = LevelSet::build(raw).unwrap();
        assert_eq!(bitrates(&set), expected);
        assert_eq!(first_level, expected_first);
    }

    #[test]
    fn duplicate_bitrates_become_redundant_urls() {
        let raw = vec![
            descriptor(500, "cdn-a"),
            descriptor(200, "cdn-a"),
            descriptor(500, "cdn-b"),
            descriptor(1000, "cdn-a"),
            descriptor(500, "cdn-c"),
            descriptor(200, "cdn-b"),
        ];
        let (set, first_level) = LevelSet::build(raw).unwrap();

        assert_eq!(bitrates(&set), vec![200, 500, 1000]);
        assert_eq!(first_level, 1);

        let url_counts: Vec<usize> = set.iter().map(|l| l.urls().len()).collect();
        assert_eq!(url_counts, vec![2, 3, 1]);

        let hosts: Vec<&str> = set
            .get(1)
            .unwrap()
            .urls()
            .iter()
            .filter_map(Url::host_str)
            .collect();
        assert_eq!(hosts, vec!["cdn-a", "cdn-b", "cdn-c"]);
    }

    #[test]
    fn canonical_level_keeps_first_descriptor_attributes() {
        let raw = vec![
            descriptor(500, "cdn-a")
                .with_name("mid")
                .with_codecs("avc1.4d401f")
                .with_resolution(640, 360),
            descriptor(500, "cdn-b").with_name("mirror"),
        ];
        let (set, _) = LevelSet::build(raw).unwrap();
        let level = set.get(0).unwrap();
        assert_eq!(level.name(), Some("mid"));
        assert_eq!(level.codecs(), Some("avc1.4d401f"));
        assert_eq!(level.resolution(), Some((640, 360)));
        assert_eq!(level.url_id(), 0);
        assert!(level.details().is_none());
    }

    #[test]
    fn advance_url_walks_mirrors_then_stops() {
        let raw = vec![descriptor(500, "cdn-a"), descriptor(500, "cdn-b")];
        let (mut set, _) = LevelSet::build(raw).unwrap();
        let level = set.get_mut(0).unwrap();
        level.set_details(PlaylistDetails::vod(Duration::from_secs(6)));

        assert!(level.has_redundant_url());
        assert_eq!(level.advance_url(), Some(1));
        assert_eq!(level.active_url().host_str(), Some("cdn-b"));
        assert!(level.details().is_none());

        assert!(!level.has_redundant_url());
        assert_eq!(level.advance_url(), None);
        assert_eq!(level.url_id(), 1);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(PlaylistDetails::vod(Duration::from_secs(10))), false)]
    #[case(Some(PlaylistDetails::live(Duration::from_secs(4))), true)]
    fn needs_reload_unless_loaded_vod(
        #[case] details: Option<PlaylistDetails>,
        #[case] expected: bool,
    ) {
        let (mut set, _) = LevelSet::build(vec![descriptor(200, "cdn-a")]).unwrap();
        if let Some(details) = details {
            set.get_mut(0).unwrap().set_details(details);
        }
        assert_eq!(set.get(0).unwrap().needs_reload(), expected);
    }

    #[test]
    fn infos_mirror_sorted_levels() {
        let raw = vec![descriptor(1000, "cdn-a"), descriptor(200, "cdn-a")];
        let (set, _) = LevelSet::build(raw).unwrap();
        let infos = set.infos();
        assert_eq!(infos.len(), 2);
        assert_eq!((infos[0].index, infos[0].bitrate), (0, 200));
        assert_eq!((infos[1].index, infos[1].bitrate), (1, 1000));
    }

    #[test]
    fn ladder_reports_bitrates() {
        let (set, _) = LevelSet::build(vec![descriptor(300, "a"), descriptor(100, "a")]).unwrap();
        assert_eq!(set.level_count(), 2);
        assert_eq!(set.level_bitrate(0), Some(100));
        assert_eq!(set.level_bitrate(2), None);
    }
}
