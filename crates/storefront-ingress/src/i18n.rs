//! UI string lookup
//!
//! Tenant bundles come from the static host. Keys a bundle lacks fall back to
//! the built-in English text below, then to the key itself.

use storefront_egress::TranslationBundle;

/// Notices that may be requested through `?notice=`
const NOTICES: &[&str] = &[
    "account.saved",
    "returns.created",
    "newsletter.subscribed",
    "newsletter.invalid",
    "auth.signed_out",
    "returns.error.no_lines",
];

pub fn lookup<'a>(bundle: &'a TranslationBundle, key: &'a str) -> &'a str {
    bundle
        .get(key)
        .or_else(|| default_text(key))
        .unwrap_or(key)
}

pub fn is_notice(key: &str) -> bool {
    NOTICES.contains(&key) || (key.starts_with("cart.error.") && default_text(key).is_some())
}

pub fn default_text(key: &str) -> Option<&'static str> {
    let text = match key {
        "nav.home" => "Home",
        "nav.products" => "Products",
        "nav.blog" => "Blog",
        "nav.cart" => "Cart",
        "nav.account" => "Account",
        "nav.login" => "Sign in",
        "nav.logout" => "Sign out",
        "nav.register" => "Create account",
        "nav.language" => "Language",

        "footer.newsletter" => "Subscribe to our newsletter",
        "footer.subscribe" => "Subscribe",
        "footer.email" => "Email address",

        "home.featured" => "Featured products",
        "home.latest_posts" => "From the blog",
        "home.view_all" => "View all",

        "products.title" => "Products",
        "products.category" => "Category",
        "products.all_categories" => "All categories",
        "products.brand" => "Brand",
        "products.search" => "Search",
        "products.min_price" => "Min price",
        "products.max_price" => "Max price",
        "products.in_stock" => "In stock only",
        "products.sort" => "Sort by",
        "products.apply" => "Apply",
        "products.empty" => "No products match your filters.",
        "products.previous" => "Previous",
        "products.next" => "Next",
        "products.page" => "Page {page} of {pages}",
        "products.out_of_stock" => "Out of stock",

        "sort.relevance" => "Relevance",
        "sort.price_asc" => "Price: low to high",
        "sort.price_desc" => "Price: high to low",
        "sort.newest" => "Newest",
        "sort.name" => "Name",

        "product.add_to_cart" => "Add to cart",
        "product.quantity" => "Quantity",
        "product.variant" => "Option",
        "product.sku" => "SKU",

        "cart.title" => "Your cart",
        "cart.empty" => "Your cart is empty.",
        "cart.item" => "Item",
        "cart.price" => "Price",
        "cart.quantity" => "Quantity",
        "cart.total" => "Total",
        "cart.subtotal" => "Subtotal",
        "cart.update" => "Update",
        "cart.remove" => "Remove",
        "cart.clear" => "Empty cart",
        "cart.checkout" => "Checkout",
        "cart.continue" => "Continue shopping",
        "cart.error.currency_mismatch" => "This product is sold in another currency.",
        "cart.error.too_many_lines" => "Your cart is full.",
        "cart.error.line_not_found" => "That item is no longer in your cart.",
        "cart.error.invalid_quantity" => "Please enter a valid quantity.",
        "cart.error.invalid_price" => "This product cannot be added to the cart.",
        "cart.error.invalid_email" => "Please enter a valid email address.",
        "cart.error.too_large" => "Your cart is too large. Remove some items first.",

        "checkout.title" => "Checkout",
        "checkout.contact" => "Contact",
        "checkout.email" => "Email",
        "checkout.shipping_address" => "Shipping address",
        "checkout.billing_address" => "Billing address",
        "checkout.billing_same" => "Same as shipping address",
        "checkout.first_name" => "First name",
        "checkout.last_name" => "Last name",
        "checkout.line1" => "Address",
        "checkout.line2" => "Apartment, suite, etc.",
        "checkout.city" => "City",
        "checkout.postal_code" => "Postal code",
        "checkout.region" => "State / region",
        "checkout.country" => "Country",
        "checkout.phone" => "Phone",
        "checkout.shipping_method" => "Shipping method",
        "checkout.payment_method" => "Payment method",
        "checkout.notes" => "Order notes",
        "checkout.coupon" => "Coupon code",
        "checkout.summary" => "Order summary",
        "checkout.place_order" => "Place order",
        "checkout.missing" => "Please complete: {fields}",
        "checkout.rejected" => "We could not place your order. Please review your details.",

        "shipping.standard" => "Standard delivery",
        "shipping.express" => "Express delivery",
        "payment.card" => "Credit card",
        "payment.paypal" => "PayPal",
        "payment.invoice" => "Invoice",

        "field.cart" => "cart items",
        "field.email" => "email",
        "field.shipping_address" => "shipping address",
        "field.billing_address" => "billing address",
        "field.shipping_method" => "shipping method",
        "field.payment_method" => "payment method",

        "confirmation.title" => "Thank you for your order",
        "confirmation.number" => "Order number",
        "confirmation.email_sent" => "A confirmation email is on its way.",

        "auth.login_title" => "Sign in",
        "auth.register_title" => "Create account",
        "auth.email" => "Email",
        "auth.password" => "Password",
        "auth.first_name" => "First name",
        "auth.last_name" => "Last name",
        "auth.newsletter" => "Send me news and offers",
        "auth.no_account" => "New here? Create an account",
        "auth.have_account" => "Already have an account? Sign in",
        "auth.error.invalid" => "Email or password is incorrect.",
        "auth.error.register" => "We could not create your account. Please check your details.",
        "auth.signed_out" => "You have been signed out.",

        "account.title" => "My account",
        "account.profile" => "Profile",
        "account.phone" => "Phone",
        "account.newsletter" => "Newsletter",
        "account.save" => "Save",
        "account.saved" => "Your profile was updated.",
        "account.orders" => "Orders",
        "account.returns" => "Returns",

        "orders.title" => "Order history",
        "orders.empty" => "You have not placed any orders yet.",
        "orders.number" => "Order",
        "orders.date" => "Date",
        "orders.status" => "Status",
        "orders.items" => "Items",
        "orders.total" => "Total",
        "orders.view" => "View",
        "orders.request_return" => "Request a return",
        "orders.back" => "Back to orders",

        "order.subtotal" => "Subtotal",
        "order.shipping" => "Shipping",
        "order.discount" => "Discount",
        "order.total" => "Total",
        "order.shipping_address" => "Shipping address",
        "order.billing_address" => "Billing address",

        "returns.title" => "Returns",
        "returns.empty" => "You have no returns.",
        "returns.new_title" => "Request a return",
        "returns.order" => "Order",
        "returns.date" => "Date",
        "returns.status" => "Status",
        "returns.reason" => "Reason",
        "returns.comment" => "Comment",
        "returns.quantity" => "Quantity to return",
        "returns.submit" => "Submit return",
        "returns.created" => "Your return request was submitted.",
        "returns.error.no_lines" => "Select at least one item to return.",

        "reason.damaged" => "Arrived damaged",
        "reason.wrong_item" => "Wrong item",
        "reason.not_as_described" => "Not as described",
        "reason.changed_mind" => "Changed my mind",

        "blog.title" => "Blog",
        "blog.read_more" => "Read more",
        "blog.empty" => "No posts yet.",
        "blog.by" => "By",

        "newsletter.subscribed" => "Thanks for subscribing!",
        "newsletter.invalid" => "Please enter a valid email address.",

        "error.home" => "Back to the home page",
        "error.bad_request.title" => "Bad request",
        "error.bad_request.body" => "We could not understand that request.",
        "error.not_found.title" => "Page not found",
        "error.not_found.body" => "The page you are looking for does not exist.",
        "error.unauthorized.title" => "Please sign in",
        "error.unauthorized.body" => "You need to sign in to see this page.",
        "error.unprocessable.title" => "Something is not right",
        "error.unprocessable.body" => "Please check your input and try again.",
        "error.bad_gateway.title" => "We are having trouble",
        "error.bad_gateway.body" => "Our shop is temporarily unavailable. Please try again in a moment.",
        "error.internal.title" => "Something went wrong",
        "error.internal.body" => "An unexpected error occurred.",

        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_bundle() {
        let bundle = TranslationBundle::from_pairs([("nav.cart", "Warenkorb")]);
        assert_eq!(lookup(&bundle, "nav.cart"), "Warenkorb");
        assert_eq!(lookup(&bundle, "nav.home"), "Home");
        assert_eq!(lookup(&bundle, "custom.key"), "custom.key");
    }

    #[test]
    fn test_notice_allow_list() {
        assert!(is_notice("account.saved"));
        assert!(is_notice("cart.error.too_many_lines"));
        assert!(!is_notice("cart.error.made_up"));
        assert!(!is_notice("<script>"));
    }
}
