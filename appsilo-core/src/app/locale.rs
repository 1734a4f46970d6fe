//! Translated-variant selection
//!
//! The caller supplies locale preferences; this module never reads the
//! process environment.

use serde::{Deserialize, Serialize};

use crate::silo::Node;

/// Ordered, expanded locale preferences
///
/// `de_DE.UTF-8@euro` expands to `de_DE` then `de`. `C` and `POSIX` mean
/// "untranslated" and are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locales {
    tags: Vec<String>,
}

/// Canonical spelling used for comparisons (`pt-BR` and `pt_BR` match)
fn canonical(tag: &str) -> String {
    tag.trim().replace('-', "_")
}

fn is_untranslated(lang: Option<&str>) -> bool {
    matches!(lang.map(str::trim), None | Some("") | Some("C"))
}

impl Locales {
    pub fn new<I, S>(preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = Vec::new();
        let mut push = |tag: String| {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        };

        for pref in preferences {
            let pref = pref.as_ref().trim();
            // strip codeset and modifier
            let base = pref.split(['.', '@']).next().unwrap_or_default();
            if base.is_empty() || base == "C" || base == "POSIX" {
                continue;
            }
            let base = canonical(base);
            let language = base.split('_').next().unwrap_or_default().to_string();
            push(base);
            push(language);
        }

        Self { tags }
    }

    /// No preferences; only untranslated variants are chosen
    pub fn untranslated() -> Self {
        Self::default()
    }

    /// Expanded tags in preference order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Position of `lang` in the preference list, `None` if not preferred
    pub fn rank(&self, lang: Option<&str>) -> Option<usize> {
        let lang = canonical(lang?);
        self.tags.iter().position(|t| *t == lang)
    }

    /// Best variant among translated siblings: the most preferred locale,
    /// then the untranslated variant, then whatever comes first.
    pub fn select<'a, I>(&self, variants: I) -> Option<&'a Node>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let variants: Vec<&'a Node> = variants.into_iter().filter(|v| v.text().is_some()).collect();

        let preferred = variants
            .iter()
            .filter_map(|v| self.rank(v.lang()).map(|rank| (rank, *v)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, v)| v);

        preferred
            .or_else(|| variants.iter().copied().find(|v| is_untranslated(v.lang())))
            .or_else(|| variants.first().copied())
    }

    /// Whether a variant in `lang` should be kept when collecting a
    /// multi-valued field such as keywords
    pub(crate) fn accepts(&self, lang: Option<&str>, best: Option<usize>) -> bool {
        if is_untranslated(lang) {
            return true;
        }
        match (self.rank(lang), best) {
            (Some(rank), Some(best)) => rank == best,
            _ => false,
        }
    }

    /// Best rank present among `langs`
    pub(crate) fn best_rank<'a>(&self, langs: impl Iterator<Item = Option<&'a str>>) -> Option<usize> {
        langs.filter_map(|lang| self.rank(lang)).min()
    }
}
