//! Vendor classification and multimodal prompt assembly.
//!
//! Each card brand is a [`Vendor`] whose [`VendorProfile`] carries the
//! filename prefix it is recognised by, its prompt templates, and whether a
//! back-face image is sent along with the front. Hello Fresh prints the
//! nutrition panel on the back, so its cards go out as two images when the
//! back is on disk and fall back to the front alone when it is not. Gousto
//! cards are always sent as a single image, and the prompt insists on
//! keeping quantities with every ingredient.
//!
//! Records already in the store were produced by these templates; edits to
//! the wording show up as differences between old and new records.

use std::fmt;
use tracing::warn;

use crate::error::SkipReason;
use crate::scanner::Candidate;

/// MIME type of every image part.
pub const IMAGE_MIME: &str = "image/webp";

/// Whether a vendor's cards are sent with their back face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingPolicy {
    /// Front only.
    FrontOnly,
    /// Front and back; degrade to front only if the back cannot be read.
    BackIfPresent,
}

/// Static description of a card brand.
#[derive(Debug)]
pub struct VendorProfile {
    /// Filename prefix that selects this vendor. `None` marks the fallback.
    pub prefix: Option<&'static str>,
    /// Display name.
    pub label: &'static str,
    /// Short key used on the command line.
    pub key: &'static str,
    pub siblings: SiblingPolicy,
    /// Prompt when both faces are sent.
    pub front_and_back: Option<&'static str>,
    /// Prompt when only the front is sent.
    pub front_only: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    HelloFresh,
    Gousto,
}

const SCHEMA: &str = r#"The JSON object should have exactly this shape:
{
  "title": string,
  "ingredients": [string],  // INGREDIENT_NOTE
  "nutrition": {
    "calories": string,
    "protein": string,
    "carbs": string,
    "fat": string
  },
  "tags": [string]
}"#;

const HELLO_FRESH_FRONT_AND_BACK: &str = "\
Please extract the recipe data from these Hello Fresh card images (front and back) into a JSON object.
{schema}
Extract all ingredients visible on the front of the card.
Extract nutrition information from the back of the card (look for Energy (kcal), Protein, Carbohydrate, Fat).
Generate suitable tags based on the title and ingredients.
";

const HELLO_FRESH_FRONT_ONLY: &str = "\
Please extract the recipe data from this Hello Fresh card image into a JSON object.
{schema}
Extract all ingredients visible on the front of the card.
For nutrition, look for values like Energy (kcal), Protein, Carbohydrate, Fat. Only the front of the card is available, so nutrition may be missing; leave those fields empty rather than guessing.
Generate suitable tags based on the title and ingredients.
";

const GOUSTO_FRONT_ONLY: &str = "\
Please extract the recipe data from this Gousto card image into a JSON object.
{schema}
Extract all ingredients visible on the front of the card. Be sure to include the quantity/measurement for each ingredient if visible.
For nutrition, look for values like Energy (kcal), Protein, Carbohydrate, Fat.
Generate suitable tags based on the title and ingredients.
";

static HELLO_FRESH: VendorProfile = VendorProfile {
    prefix: Some("hf_"),
    label: "Hello Fresh",
    key: "hf",
    siblings: SiblingPolicy::BackIfPresent,
    front_and_back: Some(HELLO_FRESH_FRONT_AND_BACK),
    front_only: HELLO_FRESH_FRONT_ONLY,
};

static GOUSTO: VendorProfile = VendorProfile {
    prefix: None,
    label: "Gousto",
    key: "gousto",
    siblings: SiblingPolicy::FrontOnly,
    front_and_back: None,
    front_only: GOUSTO_FRONT_ONLY,
};

impl Vendor {
    pub const ALL: [Vendor; 2] = [Vendor::HelloFresh, Vendor::Gousto];

    /// Resolves the vendor from a bare file name. Anything without a known
    /// prefix is a Gousto card.
    pub fn classify(file_name: &str) -> Vendor {
        Self::ALL
            .into_iter()
            .find(|v| {
                v.profile()
                    .prefix
                    .is_some_and(|prefix| file_name.starts_with(prefix))
            })
            .unwrap_or(Vendor::Gousto)
    }

    /// Like [`classify`](Vendor::classify) but accepts a store path.
    pub fn classify_path(image_front: &str) -> Vendor {
        let file_name = image_front
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(image_front);
        Self::classify(file_name)
    }

    pub fn from_key(key: &str) -> Option<Vendor> {
        Self::ALL.into_iter().find(|v| v.profile().key == key)
    }

    pub fn profile(&self) -> &'static VendorProfile {
        match self {
            Vendor::HelloFresh => &HELLO_FRESH,
            Vendor::Gousto => &GOUSTO,
        }
    }

    pub fn label(&self) -> &'static str {
        self.profile().label
    }

    /// Prompt text for this vendor, with or without the back image.
    pub fn prompt(&self, with_back: bool) -> String {
        let profile = self.profile();
        let template = match (with_back, profile.front_and_back) {
            (true, Some(t)) => t,
            _ => profile.front_only,
        };
        let note = match self {
            Vendor::HelloFresh if with_back => {
                "List ingredients from the front (measurements are likely not present)"
            }
            Vendor::HelloFresh => "List ingredients (measurements are likely not present)",
            Vendor::Gousto => {
                "IMPORTANT: Include measurements with the ingredient name (e.g. \"200g Chicken Breast\", \"1 Red Pepper\")"
            }
        };
        template.replace("{schema}", &SCHEMA.replace("INGREDIENT_NOTE", note))
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One part of a multimodal request.
#[derive(Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image {
        mime_type: &'static str,
        data: Vec<u8>,
    },
}

impl fmt::Debug for PromptPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptPart::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            PromptPart::Image { mime_type, data } => f
                .debug_struct("Image")
                .field("mime_type", mime_type)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

/// A fully assembled request for one card: a text part, then the front
/// image, then (optionally) the back image.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub vendor: Vendor,
    pub parts: Vec<PromptPart>,
    /// `true` when the vendor wanted the back image but it could not be read.
    pub degraded: bool,
}

impl ExtractionRequest {
    pub fn prompt_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            PromptPart::Text(t) => Some(t.as_str()),
            PromptPart::Image { .. } => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, PromptPart::Image { .. }))
            .count()
    }
}

/// Reads the card images from disk and assembles the request.
///
/// An unreadable front image skips the card. An unreadable back image for a
/// vendor that wants one is logged and the card is sent front-only.
pub fn build_request(candidate: &Candidate) -> Result<ExtractionRequest, SkipReason> {
    let vendor = Vendor::classify(&candidate.file_name);

    let front = std::fs::read(&candidate.front_path).map_err(|source| SkipReason::ReadImage {
        path: candidate.front_path.display().to_string(),
        source,
    })?;

    let back = match vendor.profile().siblings {
        SiblingPolicy::FrontOnly => None,
        SiblingPolicy::BackIfPresent => match std::fs::read(&candidate.back_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(
                    file = %candidate.file_name,
                    back = %candidate.back_path.display(),
                    error = %e,
                    "back image unavailable, sending front only; nutrition may be empty"
                );
                None
            }
        },
    };

    let degraded = vendor.profile().siblings == SiblingPolicy::BackIfPresent && back.is_none();
    Ok(assemble(vendor, front, back, degraded))
}

fn assemble(vendor: Vendor, front: Vec<u8>, back: Option<Vec<u8>>, degraded: bool) -> ExtractionRequest {
    let mut parts = vec![
        PromptPart::Text(vendor.prompt(back.is_some())),
        PromptPart::Image {
            mime_type: IMAGE_MIME,
            data: front,
        },
    ];
    if let Some(data) = back {
        parts.push(PromptPart::Image {
            mime_type: IMAGE_MIME,
            data,
        });
    }
    ExtractionRequest {
        vendor,
        parts,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImagesConfig;
    use crate::scanner::scan_images;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn candidate_for(dir: &std::path::Path, name: &str) -> Candidate {
        let images = ImagesConfig {
            dir: dir.to_path_buf(),
            ..Default::default()
        };
        scan_images(&images, &HashSet::new(), None)
            .unwrap()
            .candidates
            .into_iter()
            .find(|c| c.file_name == name)
            .unwrap()
    }

    #[test]
    fn test_classify_by_prefix() {
        assert_eq!(Vendor::classify("hf_katsu_front.webp"), Vendor::HelloFresh);
        assert_eq!(Vendor::classify("g_katsu_front.webp"), Vendor::Gousto);
        assert_eq!(Vendor::classify("katsu_front.webp"), Vendor::Gousto);
        assert_eq!(Vendor::classify("HF_katsu_front.webp"), Vendor::Gousto);
        assert_eq!(Vendor::classify("xhf_katsu_front.webp"), Vendor::Gousto);
    }

    #[test]
    fn test_classify_path_uses_file_name() {
        assert_eq!(
            Vendor::classify_path("images/hf_katsu_front.webp"),
            Vendor::HelloFresh
        );
        assert_eq!(Vendor::classify_path("hf_dir/g_front.webp"), Vendor::Gousto);
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Vendor::from_key("hf"), Some(Vendor::HelloFresh));
        assert_eq!(Vendor::from_key("gousto"), Some(Vendor::Gousto));
        assert_eq!(Vendor::from_key("other"), None);
    }

    #[test]
    fn test_gousto_prompt_requires_quantities() {
        let prompt = Vendor::Gousto.prompt(false);
        assert!(prompt.contains("Gousto card image"));
        assert!(prompt.contains("include the quantity/measurement"));
        assert!(prompt.contains("\"200g Chicken Breast\""));
        assert!(!prompt.contains("{schema}"));
        assert!(!prompt.contains("INGREDIENT_NOTE"));
    }

    #[test]
    fn test_hello_fresh_prompts() {
        let both = Vendor::HelloFresh.prompt(true);
        assert!(both.contains("(front and back)"));
        assert!(both.contains("from the back of the card"));
        assert!(!both.contains("quantity/measurement"));

        let front = Vendor::HelloFresh.prompt(false);
        assert!(front.contains("this Hello Fresh card image"));
        assert!(front.contains("nutrition may be missing"));
    }

    #[test]
    fn test_all_prompts_ask_for_tags_and_shape() {
        for (vendor, with_back) in [
            (Vendor::HelloFresh, true),
            (Vendor::HelloFresh, false),
            (Vendor::Gousto, false),
        ] {
            let prompt = vendor.prompt(with_back);
            assert!(prompt.contains("Generate suitable tags based on the title and ingredients."));
            for field in ["\"title\": string", "\"ingredients\": [string]", "\"nutrition\": {", "\"tags\": [string]"] {
                assert!(prompt.contains(field), "{} missing from {:?} prompt", field, vendor);
            }
        }
    }

    #[test]
    fn test_hello_fresh_with_back_sends_two_images() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hf_a_front.webp"), b"front").unwrap();
        std::fs::write(tmp.path().join("hf_a_back.webp"), b"back").unwrap();

        let request = build_request(&candidate_for(tmp.path(), "hf_a_front.webp")).unwrap();
        assert_eq!(request.vendor, Vendor::HelloFresh);
        assert_eq!(request.image_count(), 2);
        assert!(!request.degraded);
        assert_eq!(
            request.parts[2],
            PromptPart::Image {
                mime_type: IMAGE_MIME,
                data: b"back".to_vec()
            }
        );
        assert!(request.prompt_text().unwrap().contains("(front and back)"));
    }

    #[test]
    fn test_hello_fresh_without_back_degrades() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hf_a_front.webp"), b"front").unwrap();

        let request = build_request(&candidate_for(tmp.path(), "hf_a_front.webp")).unwrap();
        assert_eq!(request.image_count(), 1);
        assert!(request.degraded);
        assert!(request.prompt_text().unwrap().contains("nutrition may be missing"));
    }

    #[test]
    fn test_gousto_ignores_back_image() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("g_a_front.webp"), b"front").unwrap();
        std::fs::write(tmp.path().join("g_a_back.webp"), b"back").unwrap();

        let request = build_request(&candidate_for(tmp.path(), "g_a_front.webp")).unwrap();
        assert_eq!(request.vendor, Vendor::Gousto);
        assert_eq!(request.image_count(), 1);
        assert!(!request.degraded);
    }

    #[test]
    fn test_unreadable_front_is_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("g_a_front.webp"), b"front").unwrap();
        let candidate = candidate_for(tmp.path(), "g_a_front.webp");
        std::fs::remove_file(&candidate.front_path).unwrap();

        let err = build_request(&candidate).unwrap_err();
        assert!(matches!(err, SkipReason::ReadImage { .. }));
    }
}
