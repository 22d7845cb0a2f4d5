//! Spoken replies for the uk-UA waiter.

pub const STOPPING: &str = "Зупиняю.";
pub const HELP: &str =
    "Можу фільтрувати меню, відкривати сторінки, працювати з кошиком і підтверджувати замовлення.";
pub const FILTERS_RESET: &str = "Скидаю фільтри.";
pub const FILTERS_APPLIED: &str = "Застосовую фільтри.";
pub const OPEN_CHECKOUT: &str = "Переходжу до оформлення.";
pub const CLEARING_CART: &str = "Очищаю кошик.";
pub const CART_CLEARED: &str = "Кошик очищено.";
pub const SIGN_IN_REQUIRED: &str = "Потрібно увійти, щоб оформити замовлення.";
pub const NOT_UNDERSTOOD: &str = "Не зрозумів команду. Скажи чіткіше.";

/// Confirmation for a navigation target.
pub fn opening(path: &str) -> &'static str {
    match path {
        "/menu" => "Відкриваю меню.",
        "/cart" => "Відкриваю кошик.",
        "/profile" => "Відкриваю кабінет.",
        "/admin" => "Відкриваю адмін панель.",
        "/" => "Відкриваю головну.",
        "/checkout" => OPEN_CHECKOUT,
        _ => "Відкриваю.",
    }
}

pub fn added(dish_name: &str) -> String {
    format!("Додав {dish_name} в кошик.")
}

pub fn removed(dish_name: &str) -> String {
    format!("Прибрав {dish_name} з кошика.")
}

pub fn not_found(query: &str) -> String {
    format!("Не знайшов страву \"{query}\".")
}
