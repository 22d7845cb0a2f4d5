//! Rule-based intent parser: transcript → filters, actions, or unknown.
//!
//! The grammar is an ordered list of pure rules over the normalized
//! transcript; the first rule that matches decides the result. Rules are
//! public so they can be exercised one at a time.
//!
//! | Order | Rule | Result |
//! |-------|------|--------|
//! | 1 | stop | `stop_all` |
//! | 2 | help | `help` |
//! | 3 | filters_clear | `filters_clear` |
//! | 4 | navigate | `navigate{path}` (allow-listed destinations only) |
//! | 5 | checkout_confirm | `checkout_confirm` |
//! | 6 | checkout_open | `checkout_open` |
//! | 7 | cart_clear | `cart_clear` |
//! | 8 | cart_add / cart_remove | one action per spoken name |
//! | 9 | filters | category, price, tags, query, rating, sort |

use crate::phrases;
use crate::signal::{Category, DishTag, SortOrder, VoiceAction, VoiceFilters};
use crate::text::{is_blank, normalize_transcript};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

macro_rules! regex {
    ($pattern:expr) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($pattern).expect("voice grammar pattern"))
    }};
}

/// Parsed meaning of one transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Menu criteria for the filter consumer, with a confirmation to speak.
    Filters { filters: VoiceFilters, reply: String },
    /// One or more actions sharing a single reply. Cart operations carry no
    /// reply; the orchestrator speaks once it knows whether the dish was found.
    Actions {
        actions: Vec<VoiceAction>,
        reply: Option<String>,
    },
    /// Nothing recognized; the lifecycle controller speaks a fallback.
    Unknown,
}

impl Intent {
    pub fn reply(&self) -> Option<&str> {
        match self {
            Intent::Filters { reply, .. } => Some(reply.as_str()),
            Intent::Actions { reply, .. } => reply.as_deref(),
            Intent::Unknown => None,
        }
    }

    fn action(action: VoiceAction, reply: &str) -> Self {
        Intent::Actions {
            actions: vec![action],
            reply: Some(reply.to_string()),
        }
    }
}

/// A grammar rule over normalized text.
pub type Rule = fn(&str) -> Option<Intent>;

/// The grammar, in precedence order.
pub const RULES: &[(&str, Rule)] = &[
    ("stop", stop_rule),
    ("help", help_rule),
    ("filters_clear", filters_clear_rule),
    ("navigate", navigate_rule),
    ("checkout_confirm", checkout_confirm_rule),
    ("checkout_open", checkout_open_rule),
    ("cart_clear", cart_clear_rule),
    ("cart_add", cart_add_rule),
    ("cart_remove", cart_remove_rule),
    ("filters", filters_rule),
];

/// Parse a raw transcript.
pub fn parse(raw: &str) -> Intent {
    let text = normalize_transcript(raw);
    if is_blank(&text) {
        return Intent::Unknown;
    }
    for (name, rule) in RULES {
        if let Some(intent) = rule(&text) {
            debug!(rule = name, text = %text, "intent rule matched");
            return intent;
        }
    }
    debug!(text = %text, "no intent rule matched");
    Intent::Unknown
}

fn contains_any(text: &str, stems: &[&str]) -> bool {
    stems.iter().any(|s| text.contains(s))
}

// ---------------------------------------------------------------------------
// Control rules
// ---------------------------------------------------------------------------

const STOP_WORDS: &[&str] = &["стоп", "зупини", "скасуй", "відміни", "cancel", "stop"];
const HELP_WORDS: &[&str] = &["допоможи", "що ти вмієш", "help"];
const FILTERS_CLEAR_WORDS: &[&str] = &[
    "скинь фільтр",
    "очисти фільтр",
    "видали фільтр",
    "clear filters",
    "reset filters",
];

pub fn stop_rule(text: &str) -> Option<Intent> {
    contains_any(text, STOP_WORDS).then(|| Intent::action(VoiceAction::StopAll, phrases::STOPPING))
}

pub fn help_rule(text: &str) -> Option<Intent> {
    contains_any(text, HELP_WORDS).then(|| Intent::action(VoiceAction::Help, phrases::HELP))
}

pub fn filters_clear_rule(text: &str) -> Option<Intent> {
    contains_any(text, FILTERS_CLEAR_WORDS)
        .then(|| Intent::action(VoiceAction::FiltersClear, phrases::FILTERS_RESET))
}

// ---------------------------------------------------------------------------
// Navigation and checkout
// ---------------------------------------------------------------------------

const NAV_VERBS: &[&str] = &["відкрий", "перейди", "open", "go to"];

const NAV_DESTINATIONS: &[(&[&str], &str)] = &[
    (&["меню", "menu"], "/menu"),
    (&["кошик", "cart"], "/cart"),
    (&["профіль", "кабінет", "profile", "account"], "/profile"),
    (&["адмін", "admin"], "/admin"),
    (&["вхід", "логін", "login"], "/auth"),
    (&["головн", "home"], "/"),
];

const CHECKOUT_WORDS: &[&str] = &["оформ", "checkout"];
const CONFIRM_WORDS: &[&str] = &["підтверд", "оформи", "замовляю", "confirm", "place order"];
const CART_CLEAR_WORDS: &[&str] = &[
    "очисти кошик",
    "спорожни кошик",
    "clear cart",
    "clear the cart",
    "empty cart",
];

pub fn navigate_rule(text: &str) -> Option<Intent> {
    if !contains_any(text, NAV_VERBS) {
        return None;
    }
    NAV_DESTINATIONS
        .iter()
        .find(|(words, _)| contains_any(text, words))
        .map(|(_, path)| {
            Intent::action(
                VoiceAction::Navigate {
                    path: (*path).to_string(),
                },
                phrases::opening(path),
            )
        })
}

pub fn checkout_confirm_rule(text: &str) -> Option<Intent> {
    contains_any(text, CONFIRM_WORDS).then(|| Intent::Actions {
        actions: vec![VoiceAction::CheckoutConfirm],
        reply: None,
    })
}

pub fn checkout_open_rule(text: &str) -> Option<Intent> {
    (contains_any(text, NAV_VERBS) && contains_any(text, CHECKOUT_WORDS))
        .then(|| Intent::action(VoiceAction::CheckoutOpen, phrases::OPEN_CHECKOUT))
}

pub fn cart_clear_rule(text: &str) -> Option<Intent> {
    contains_any(text, CART_CLEAR_WORDS)
        .then(|| Intent::action(VoiceAction::CartClear, phrases::CLEARING_CART))
}

// ---------------------------------------------------------------------------
// Cart add / remove
// ---------------------------------------------------------------------------

pub fn cart_add_rule(text: &str) -> Option<Intent> {
    let caps = regex!(r"^(?:(?:будь ласка|please)\s+)?(?:додай|додати|add)\s+(.+)$").captures(text)?;
    let tail = regex!(r"(?:^|\s+)(?:(?:в|у|до)\s+(?:кошик|кошика)|(?:to|into)\s+(?:the\s+|my\s+)?cart)\b.*$");
    let names = split_names(&caps[1], tail);
    cart_intent(names, |name| VoiceAction::CartAdd { name })
}

pub fn cart_remove_rule(text: &str) -> Option<Intent> {
    let caps = regex!(r"^(?:(?:будь ласка|please)\s+)?(?:прибери|видали|забери|remove|delete)\s+(.+)$")
        .captures(text)?;
    let tail = regex!(r"(?:^|\s+)(?:(?:з|із|зі)\s+(?:кошика|кошик)|from\s+(?:the\s+|my\s+)?cart)\b.*$");
    let names = split_names(&caps[1], tail);
    cart_intent(names, |name| VoiceAction::CartRemove { name })
}

fn cart_intent(names: Vec<String>, make: impl Fn(String) -> VoiceAction) -> Option<Intent> {
    if names.is_empty() {
        return None;
    }
    Some(Intent::Actions {
        actions: names.into_iter().map(make).collect(),
        reply: None,
    })
}

/// "маргариту і борщ в кошик" → ["маргариту", "борщ"]
pub fn split_names(rest: &str, tail: &Regex) -> Vec<String> {
    let rest = regex!(r"^(?:(?:мені|будь ласка|please)\s+)+").replace(rest, "");
    let rest = tail.replace(&rest, "");
    regex!(r"\s*[,+]\s*|\s+(?:і|й|та|and)\s+")
        .split(rest.trim())
        .map(|part| part.trim_matches(|c: char| matches!(c, ',' | '+' | '.') || c.is_whitespace()))
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Category keyword families, checked in order.
pub const CATEGORY_SYNONYMS: &[(Category, &[&str])] = &[
    (Category::Pizza, &["піц", "пиц", "pizza"]),
    (Category::Soup, &["суп", "борщ", "бульйон", "soup"]),
    (Category::Salad, &["салат", "salad"]),
    (
        Category::Dessert,
        &["десерт", "солодк", "торт", "тіраміс", "dessert", "sweet"],
    ),
    (
        Category::Drink,
        &["напій", "напо", "пит", "кава", "каву", "кави", "чай", "drink"],
    ),
];

/// Tag keyword dictionaries; any number may match.
pub const TAG_SYNONYMS: &[(DishTag, &[&str])] = &[
    (DishTag::Spicy, &["гостр", "пікант", "остр", "spicy"]),
    (DishTag::Sweet, &["солод", "торт", "тіраміс", "dessert", "sweet"]),
    (DishTag::Vegetarian, &["вегет", "веган", "vegetarian", "vegan"]),
    (DishTag::Light, &["легк", "light"]),
    (
        DishTag::Meat,
        &["мяс", "курк", "ялович", "свин", "meat", "chicken", "beef", "pork"],
    ),
    (DishTag::Big, &["велик", "big"]),
    (DishTag::Cold, &["холод", "льод", "cold", "iced"]),
];

const SORT_SYNONYMS: &[(SortOrder, &[&str])] = &[
    (
        SortOrder::RatingDesc,
        &["найпопуляр", "популярн", "топ", "рекоменд", "best", "popular"],
    ),
    (
        SortOrder::PriceAsc,
        &["дешевш", "за ціною зрост", "price asc", "cheapest", "cheaper"],
    ),
    (
        SortOrder::PriceDesc,
        &["дорожч", "за ціною спад", "price desc", "most expensive", "pricier"],
    ),
    (SortOrder::RatingDesc, &["за рейтингом", "by rating"]),
];

const QUERY_FILLER: &[&str] = &[
    "мені", "будь", "ласка", "страви", "страву", "усі", "всі", "me", "please", "all", "dishes",
];

pub fn filters_rule(text: &str) -> Option<Intent> {
    let filters = extract_filters(text);
    (!filters.is_empty()).then(|| Intent::Filters {
        filters,
        reply: phrases::FILTERS_APPLIED.to_string(),
    })
}

/// Run every filter extractor; the result may be empty.
pub fn extract_filters(text: &str) -> VoiceFilters {
    VoiceFilters {
        category: extract_category(text),
        max_price: extract_max_price(text),
        tags: extract_tags(text),
        query: extract_query(text),
        rating_from: extract_rating(text),
        sort: extract_sort(text),
    }
}

pub fn extract_category(text: &str) -> Option<Category> {
    CATEGORY_SYNONYMS
        .iter()
        .find(|(_, stems)| contains_any(text, stems))
        .map(|(category, _)| *category)
}

pub fn extract_tags(text: &str) -> BTreeSet<DishTag> {
    TAG_SYNONYMS
        .iter()
        .filter(|(_, stems)| contains_any(text, stems))
        .map(|(tag, _)| *tag)
        .collect()
}

pub fn extract_sort(text: &str) -> Option<SortOrder> {
    SORT_SYNONYMS
        .iter()
        .find(|(_, stems)| contains_any(text, stems))
        .map(|(sort, _)| *sort)
}

fn max_price_pattern() -> &'static Regex {
    regex!(r"(?:^|\s)(?:до|менше|дешевше за|under|less than|below)\s*([0-9]{1,5})\b")
}

fn rating_pattern() -> &'static Regex {
    regex!(r"(?:рейтинг(?:ом)?\s*від|від|rating\s*from|rating\s*above|rating)\s*([0-9](?:[.,][0-9])?)\b")
}

pub fn extract_max_price(text: &str) -> Option<u32> {
    max_price_pattern()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn extract_rating(text: &str) -> Option<f32> {
    rating_pattern()
        .captures(text)
        .and_then(|caps| caps[1].replace(',', ".").parse::<f32>().ok())
        .filter(|r| (0.0..=5.0).contains(r))
}

/// Free text after "find/show", cut at the price or rating phrase and minus
/// words already understood as category, tag or sort keywords.
pub fn extract_query(text: &str) -> Option<String> {
    let caps = regex!(r"(?:знайди|покажи|show|find)\s+(.+)$").captures(text)?;
    // Whatever follows a price or rating ("грн", "зірок") is part of that phrase.
    let rest = regex!(r"(?:^|\s)(?:до|менше|дешевше за|under|less than|below)\s*[0-9]{1,5}\b.*$")
        .replace(&caps[1], "");
    let rest = regex!(
        r"(?:^|\s)(?:(?:з|із|зі|with)\s+)?(?:рейтинг\S*\s*від|від|rating\s*from|rating\s*above|rating)\s*[0-9](?:[.,][0-9])?\b.*$"
    )
    .replace(&rest, "");
    let rest = regex!(r"(?:^|\s)(?:в|у)\s+(?:кошик|cart)\b.*$").replace(&rest, "");
    let rest = regex!(r"за ціною \S+|за рейтингом|by rating|price (?:asc|desc)|most expensive")
        .replace_all(&rest, " ");

    let keyword_families = CATEGORY_SYNONYMS
        .iter()
        .map(|(_, s)| *s)
        .chain(TAG_SYNONYMS.iter().map(|(_, s)| *s))
        .chain(SORT_SYNONYMS.iter().map(|(_, s)| *s));
    let keywords: Vec<&str> = keyword_families.flatten().copied().collect();

    let words: Vec<&str> = rest
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '+' | '.'))
        .filter(|w| !w.is_empty())
        .filter(|w| !QUERY_FILLER.contains(w))
        .filter(|w| !keywords.iter().any(|k| !k.contains(' ') && w.contains(k)))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(intent: &Intent) -> &[VoiceAction] {
        match intent {
            Intent::Actions { actions, .. } => actions,
            other => panic!("expected actions, got {other:?}"),
        }
    }

    fn filters(intent: &Intent) -> &VoiceFilters {
        match intent {
            Intent::Filters { filters, .. } => filters,
            other => panic!("expected filters, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_punctuation_only_are_unknown() {
        for t in ["", "   ", "\t\n", "...", "?!", " , + . "] {
            assert_eq!(parse(t), Intent::Unknown, "{t:?}");
        }
    }

    #[test]
    fn gibberish_is_unknown() {
        assert_eq!(parse("ля ля ля"), Intent::Unknown);
    }

    #[test]
    fn control_rules() {
        let i = parse("Стоп!");
        assert_eq!(actions(&i), &[VoiceAction::StopAll]);
        assert_eq!(i.reply(), Some(phrases::STOPPING));

        assert_eq!(actions(&parse("що ти вмієш?")), &[VoiceAction::Help]);
        assert_eq!(actions(&parse("скинь фільтри")), &[VoiceAction::FiltersClear]);
        assert_eq!(actions(&parse("clear filters please")), &[VoiceAction::FiltersClear]);
    }

    #[test]
    fn navigation_to_known_destinations() {
        let i = parse("Відкрий кошик");
        assert_eq!(actions(&i), &[VoiceAction::Navigate { path: "/cart".into() }]);
        assert_eq!(i.reply(), Some("Відкриваю кошик."));

        assert_eq!(
            actions(&parse("перейди на головну")),
            &[VoiceAction::Navigate { path: "/".into() }]
        );
        assert_eq!(
            actions(&parse("go to my profile")),
            &[VoiceAction::Navigate { path: "/profile".into() }]
        );
    }

    #[test]
    fn unknown_destination_falls_through() {
        assert_eq!(navigate_rule("відкрий щось"), None);
        assert_eq!(parse("відкрий щось"), Intent::Unknown);
    }

    #[test]
    fn checkout_rules() {
        let confirm = parse("оформи замовлення");
        assert_eq!(actions(&confirm), &[VoiceAction::CheckoutConfirm]);
        assert_eq!(confirm.reply(), None);

        let open = parse("перейди до оформлення");
        assert_eq!(actions(&open), &[VoiceAction::CheckoutOpen]);
        assert_eq!(open.reply(), Some(phrases::OPEN_CHECKOUT));

        assert_eq!(actions(&parse("open checkout")), &[VoiceAction::CheckoutOpen]);
    }

    #[test]
    fn cart_clear() {
        assert_eq!(actions(&parse("очисти кошик")), &[VoiceAction::CartClear]);
    }

    #[test]
    fn multi_add_preserves_order() {
        let i = parse("додай маргариту і борщ в кошик");
        assert_eq!(
            actions(&i),
            &[
                VoiceAction::CartAdd { name: "маргариту".into() },
                VoiceAction::CartAdd { name: "борщ".into() },
            ]
        );
        assert_eq!(i.reply(), None);

        let i = parse("add pepperoni, caesar + lemonade to cart");
        let names: Vec<_> = actions(&i)
            .iter()
            .map(|a| match a {
                VoiceAction::CartAdd { name } => name.as_str(),
                other => panic!("{other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["pepperoni", "caesar", "lemonade"]);
    }

    #[test]
    fn conjunctions_split_on_whole_words_only() {
        assert_eq!(
            actions(&parse("додай мені тірамісу та чай у кошик")),
            &[
                VoiceAction::CartAdd { name: "тірамісу".into() },
                VoiceAction::CartAdd { name: "чай".into() },
            ]
        );
    }

    #[test]
    fn add_without_names_falls_through() {
        assert_eq!(cart_add_rule("додай в кошик"), None);
    }

    #[test]
    fn remove_without_cart_phrase() {
        assert_eq!(
            actions(&parse("прибери щось дивне")),
            &[VoiceAction::CartRemove { name: "щось дивне".into() }]
        );
        assert_eq!(
            actions(&parse("видали борщ з кошика")),
            &[VoiceAction::CartRemove { name: "борщ".into() }]
        );
    }

    #[test]
    fn pizza_under_200() {
        let i = parse("покажи піцу до 200");
        let f = filters(&i);
        assert_eq!(f.category, Some(Category::Pizza));
        assert_eq!(f.max_price, Some(200));
        assert!(f.tags.is_empty());
        assert_eq!(f.query, None);
        assert_eq!(f.rating_from, None);
        assert_eq!(f.sort, None);
        assert_eq!(i.reply(), Some(phrases::FILTERS_APPLIED));
    }

    #[test]
    fn category_is_stable_under_synonyms() {
        for (category, stems) in CATEGORY_SYNONYMS {
            for stem in *stems {
                assert_eq!(extract_category(stem), Some(*category), "{stem}");
                let i = parse(&format!("хочу {stem}"));
                assert_eq!(filters(&i).category, Some(*category), "{stem}");
            }
        }
    }

    #[test]
    fn tags_co_occur() {
        let f = extract_filters("гострі мясні страви з льодом");
        assert_eq!(
            f.tags,
            [DishTag::Spicy, DishTag::Meat, DishTag::Cold]
                .into_iter()
                .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn rating_and_price_do_not_collide() {
        assert_eq!(extract_rating("рейтинг від 4.5"), Some(4.5));
        assert_eq!(extract_rating("rating 4,5"), Some(4.5));
        assert_eq!(extract_rating("від 100 до 200"), None);
        assert_eq!(extract_max_price("від 100 до 200"), Some(200));
        assert_eq!(extract_max_price("under 150"), Some(150));
        assert_eq!(extract_max_price("додай 2 піци"), None);
    }

    #[test]
    fn sort_families() {
        assert_eq!(extract_sort("найпопулярніші десерти"), Some(SortOrder::RatingDesc));
        assert_eq!(extract_sort("що дешевше"), Some(SortOrder::PriceAsc));
        assert_eq!(extract_sort("most expensive drinks"), Some(SortOrder::PriceDesc));
        assert_eq!(extract_sort("за рейтингом"), Some(SortOrder::RatingDesc));
        assert_eq!(extract_sort("борщ"), None);
    }

    #[test]
    fn query_drops_category_words() {
        assert_eq!(extract_query("знайди пепероні"), Some("пепероні".into()));
        assert_eq!(extract_query("покажи піцу пепероні до 300"), Some("пепероні".into()));
        assert_eq!(extract_query("покажи мені гострий суп"), None);
        assert_eq!(extract_query("покажи піцу"), None);
        assert_eq!(extract_query("борщ"), None);
    }

    #[test]
    fn query_stops_at_price_and_rating_phrases() {
        let f = extract_filters("покажи піцу до 200 грн");
        assert_eq!(f.category, Some(Category::Pizza));
        assert_eq!(f.max_price, Some(200));
        assert_eq!(f.query, None);

        assert_eq!(extract_query("покажи піцу до 200 гривень"), None);
        assert_eq!(extract_query("покажи пепероні до 300 грн будь ласка"), Some("пепероні".into()));

        let f = extract_filters("покажи страви з рейтингом від 4");
        assert_eq!(f.rating_from, Some(4.0));
        assert_eq!(f.query, None);
        assert_eq!(extract_query("знайди пепероні з рейтингом від 4.5 зірок"), Some("пепероні".into()));
    }

    #[test]
    fn precedence_prefers_earlier_rules() {
        // navigation verb and a price pattern: navigation wins
        assert_eq!(
            actions(&parse("відкрий меню до 200")),
            &[VoiceAction::Navigate { path: "/menu".into() }]
        );
        // stop beats everything
        assert_eq!(actions(&parse("стоп, додай борщ")), &[VoiceAction::StopAll]);
    }

    #[test]
    fn rules_are_ordered_as_documented() {
        let names: Vec<&str> = RULES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.first(), Some(&"stop"));
        assert_eq!(names.last(), Some(&"filters"));
        assert_eq!(names.len(), 10);
    }
}
