//! Shared lookup-key map for one mention batch.

use std::collections::HashMap;

use umls_model::{KeyKind, MentionId, MentionKeys};

/// One mention asking for a key, and through which form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRequest {
    pub mention: MentionId,
    pub kind: KeyKind,
}

/// Lookup key string to every mention requesting it.
///
/// Built once per batch before the reference scan. Empty keys are never
/// registered, and measurement-like mentions register nothing, so neither
/// can gather evidence.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    entries: HashMap<String, Vec<KeyRequest>>,
    requests: usize,
}

impl KeyMap {
    /// Build the map from keyed mentions; `mentions[i]` gets id `i`.
    ///
    /// Requests for a key are stored in mention-id order.
    pub fn build(mentions: &[MentionKeys]) -> Self {
        let mut map = Self::default();
        for (index, keys) in mentions.iter().enumerate() {
            if keys.is_measurement {
                continue;
            }
            let Ok(id) = u32::try_from(index) else {
                break;
            };
            for key in keys.keys.iter().filter(|k| !k.key.is_empty()) {
                map.entries
                    .entry(key.key.clone())
                    .or_default()
                    .push(KeyRequest {
                        mention: MentionId(id),
                        kind: key.kind,
                    });
                map.requests += 1;
            }
        }
        map
    }

    /// Requests for a canonical key, if any mention asked for it.
    pub fn get(&self, key: &str) -> Option<&[KeyRequest]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of distinct key strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total (key, mention) pairs.
    pub fn request_count(&self) -> usize {
        self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umls_model::LookupKey;

    fn keyed(normalized: &str, is_measurement: bool, keys: &[(KeyKind, &str)]) -> MentionKeys {
        MentionKeys {
            normalized: normalized.to_string(),
            canonical: normalized.to_string(),
            is_measurement,
            keys: keys.iter().map(|(kind, key)| LookupKey::new(*kind, *key)).collect(),
            type_hints: Vec::new(),
        }
    }

    #[test]
    fn shared_keys_list_every_mention() {
        let map = KeyMap::build(&[
            keyed(
                "pleural effusion",
                false,
                &[(KeyKind::FullNorm, "pleural effusion"), (KeyKind::Head, "effusion")],
            ),
            keyed("effusion", false, &[(KeyKind::FullNorm, "effusion")]),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.request_count(), 3);
        assert_eq!(
            map.get("effusion"),
            Some(
                &[
                    KeyRequest {
                        mention: MentionId(0),
                        kind: KeyKind::Head
                    },
                    KeyRequest {
                        mention: MentionId(1),
                        kind: KeyKind::FullNorm
                    },
                ][..]
            )
        );
    }

    #[test]
    fn empty_and_measurement_keys_are_not_registered() {
        let map = KeyMap::build(&[
            keyed("", false, &[(KeyKind::FullNorm, "")]),
            keyed("35 cm", true, &[(KeyKind::FullNorm, "35 cm"), (KeyKind::Head, "cm")]),
        ]);
        assert!(map.is_empty());
        assert!(map.get("").is_none());
        assert!(map.get("cm").is_none());
    }
}
