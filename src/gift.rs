//! Gift ideas as returned by the model.
//!
//! The model's output is untrusted: fields may be missing, prices may come
//! back as numbers, and categories may be anything at all. Deserialization is
//! lenient where the original payload was loosely typed and strict nowhere.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GiftCategory {
    Luxury,
    Music,
    Gaming,
    Books,
    Photo,
    Art,
    Sport,
    Food,
    Travel,
    Accessories,
    Fashion,
    Love,
    Special,
    /// Anything the model invents outside the closed set.
    #[default]
    Other,
}

impl GiftCategory {
    pub const ALL: [GiftCategory; 14] = [
        GiftCategory::Luxury,
        GiftCategory::Music,
        GiftCategory::Gaming,
        GiftCategory::Books,
        GiftCategory::Photo,
        GiftCategory::Art,
        GiftCategory::Sport,
        GiftCategory::Food,
        GiftCategory::Travel,
        GiftCategory::Accessories,
        GiftCategory::Fashion,
        GiftCategory::Love,
        GiftCategory::Special,
        GiftCategory::Other,
    ];

    /// Wire name, as listed in the prompt. `Other` goes out as "default".
    pub fn as_str(self) -> &'static str {
        match self {
            GiftCategory::Luxury => "luxury",
            GiftCategory::Music => "music",
            GiftCategory::Gaming => "gaming",
            GiftCategory::Books => "books",
            GiftCategory::Photo => "photo",
            GiftCategory::Art => "art",
            GiftCategory::Sport => "sport",
            GiftCategory::Food => "food",
            GiftCategory::Travel => "travel",
            GiftCategory::Accessories => "accessories",
            GiftCategory::Fashion => "fashion",
            GiftCategory::Love => "love",
            GiftCategory::Special => "special",
            GiftCategory::Other => "default",
        }
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(GiftCategory::Other)
    }

    /// Icon shown on the card header.
    pub fn icon(self) -> &'static str {
        match self {
            GiftCategory::Luxury => "gem",
            GiftCategory::Music => "music",
            GiftCategory::Gaming => "gamepad",
            GiftCategory::Books => "book",
            GiftCategory::Photo => "camera",
            GiftCategory::Art => "palette",
            GiftCategory::Sport => "dumbbell",
            GiftCategory::Food => "utensils",
            GiftCategory::Travel => "plane",
            GiftCategory::Accessories => "watch",
            GiftCategory::Fashion => "shirt",
            GiftCategory::Love => "heart",
            GiftCategory::Special => "star",
            GiftCategory::Other => "gift",
        }
    }
}

impl Serialize for GiftCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GiftCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => GiftCategory::parse(&s),
            _ => GiftCategory::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marketplace {
    Ozon,
    Wildberries,
    YandexMarket,
}

impl Marketplace {
    pub fn label(self) -> &'static str {
        match self {
            Marketplace::Ozon => "Ozon",
            Marketplace::Wildberries => "WB",
            Marketplace::YandexMarket => "Market",
        }
    }

    /// Search URL pattern the model is asked to follow.
    pub fn search_url_pattern(self) -> &'static str {
        match self {
            Marketplace::Ozon => "https://www.ozon.ru/search/?text=product+name",
            Marketplace::Wildberries => "https://www.wildberries.ru/catalog/0/search.aspx?search=product+name",
            Marketplace::YandexMarket => "https://market.yandex.ru/search?text=product+name",
        }
    }

    pub fn link_field(self) -> &'static str {
        match self {
            Marketplace::Ozon => "ozon_link",
            Marketplace::Wildberries => "wildberries_link",
            Marketplace::YandexMarket => "yandex_market_link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceLink {
    pub marketplace: Marketplace,
    pub url: String,
}

/// One recommended gift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftOffer {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub price_range: String,
    #[serde(default)]
    pub category: GiftCategory,
    #[serde(default = "default_available", deserialize_with = "lenient_available")]
    pub available_in_marketplaces: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_link")]
    pub ozon_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_link")]
    pub wildberries_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_link")]
    pub yandex_market_link: Option<String>,
}

impl GiftOffer {
    /// Links worth showing: none for intangible gifts, otherwise only the
    /// marketplaces the model actually filled in.
    pub fn marketplace_links(&self) -> Vec<MarketplaceLink> {
        if !self.available_in_marketplaces {
            return Vec::new();
        }
        [
            (Marketplace::Ozon, &self.ozon_link),
            (Marketplace::Wildberries, &self.wildberries_link),
            (Marketplace::YandexMarket, &self.yandex_market_link),
        ]
        .into_iter()
        .filter_map(|(marketplace, link)| {
            link.as_ref().map(|url| MarketplaceLink { marketplace, url: url.clone() })
        })
        .collect()
    }
}

fn default_available() -> bool {
    true
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

// Only an explicit `false` hides the marketplace buttons.
fn lenient_available<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(!matches!(value, Some(serde_json::Value::Bool(false))))
}

fn lenient_link<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}
