use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use std::{collections::BTreeMap, convert::Infallible};

use crate::session::read_cookie;

pub const LANGUAGE_COOKIE: &str = "lang";

/// Interface language of the gallery and shared controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Hi,
    Te,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Te];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "hi" => Some(Language::Hi),
            "te" => Some(Language::Te),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
        }
    }

    /// Name of the language in its own script, for the switcher.
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "हिन्दी",
            Language::Te => "తెలుగు",
        }
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::En => EN,
            Language::Hi => HI,
            Language::Te => TE,
        }
    }

    /// Looks up `key`; unknown keys render as the key itself.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        self.table()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(key)
    }

    /// The whole table, handed to templates as `t`.
    pub fn translations(&self) -> BTreeMap<&'static str, &'static str> {
        let mut map: BTreeMap<_, _> = EN.iter().map(|(k, _)| (*k, *k)).collect();
        map.extend(self.table().iter().copied());
        map
    }
}

/// Language selected through the `lang` cookie; English when absent or unknown.
impl<S> FromRequestParts<S> for Language
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(read_cookie(&parts.headers, LANGUAGE_COOKIE)
            .and_then(|code| Language::from_code(&code))
            .unwrap_or_default())
    }
}

const EN: &[(&str, &str)] = &[
    ("imageGallery", "Photo Gallery"),
    (
        "galleryDesc",
        "Explore visual documentation from field studies, workshops, and research missions.",
    ),
    ("uploadImage", "Upload New Gallery Image"),
    ("imageUpload", "Upload Image"),
    ("imageName", "Image Name"),
    ("createImageCategory", "Create New Category (Optional)"),
    ("selectImageCategory", "Select Category"),
    ("selectCategory", "Select a category..."),
    ("imageDescription", "Description"),
    ("uploading", "Uploading..."),
    ("addImage", "Add Image"),
    ("cancel", "Cancel"),
    ("items", "items"),
    ("noImagesInCategory", "No images in this category"),
    ("approve", "Approve"),
    ("addNew", "Add New"),
    ("uncategorized", "Uncategorized"),
    ("delete", "Delete"),
];

const HI: &[(&str, &str)] = &[
    ("imageGallery", "फोटो गैलरी"),
    (
        "galleryDesc",
        "क्षेत्र अध्ययन, कार्यशालाओं और अनुसंधान अभियानों से दृश्य प्रलेखन का अन्वेषण करें।",
    ),
    ("uploadImage", "नई छवि अपलोड करें"),
    ("imageUpload", "छवि अपलोड"),
    ("imageName", "छवि का नाम"),
    ("createImageCategory", "नई श्रेणी बनाएँ (वैकल्पिक)"),
    ("selectImageCategory", "श्रेणी चुनें"),
    ("selectCategory", "एक श्रेणी चुनें..."),
    ("imageDescription", "विवरण"),
    ("uploading", "अपलोड हो रहा है..."),
    ("addImage", "छवि जोड़ें"),
    ("cancel", "रद्द करें"),
    ("items", "आइटम"),
    ("noImagesInCategory", "इस श्रेणी में कोई चित्र नहीं हैं"),
    ("approve", "मंजूर करें"),
    ("addNew", "नया जोड़ें"),
    ("uncategorized", "श्रेणी रहित"),
    ("delete", "हटाएं"),
];

const TE: &[(&str, &str)] = &[
    ("imageGallery", "ఫోటో గ్యాలరీ"),
    (
        "galleryDesc",
        "క్షేత్ర అధ్యయనాలు, వర్క్‌షాప్‌లు మరియు పరిశోధన మిషన్ల నుండి దృశ్య పత్రాలను అన్వేషించండి.",
    ),
    ("uploadImage", "కొత్త చిత్రాన్ని అప్‌లోడ్ చేయండి"),
    ("imageUpload", "చిత్రం అప్‌లోడ్"),
    ("imageName", "చిత్రం పేరు"),
    ("createImageCategory", "కొత్త వర్గాన్ని సృష్టించండి (ఐచ్ఛికం)"),
    ("selectImageCategory", "వర్గాన్ని ఎంచుకోండి"),
    ("selectCategory", "ఒక వర్గాన్ని ఎంచుకోండి..."),
    ("imageDescription", "వివరణ"),
    ("uploading", "అప్‌లోడ్ అవుతోంది..."),
    ("addImage", "చిత్రాన్ని జోడించు"),
    ("cancel", "రద్దు చేయి"),
    ("items", "అంశాలు"),
    ("noImagesInCategory", "ఈ వర్గంలో చిత్రాలు లేవు"),
    ("approve", "ఆమోదించు"),
    ("addNew", "కొత్తది జోడించు"),
    ("uncategorized", "వర్గీకరించబడలేదు"),
    ("delete", "తొలగించు"),
];
