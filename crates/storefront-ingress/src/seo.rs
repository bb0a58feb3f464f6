//! SEO plumbing
//!
//! Page metadata (title, description, canonical URL, hreflang alternates,
//! Open Graph) plus the per-tenant `robots.txt` and `sitemap.xml`.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use storefront_core::TenantContext;
use storefront_egress::models::ProductQuery;
use tracing::warn;

use crate::context::PageContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternate {
    pub hreflang: String,
    pub href: String,
}

/// Head metadata for one rendered page
#[derive(Debug, Clone)]
pub struct SeoMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub alternates: Vec<Alternate>,
    pub site_name: String,
    pub og_type: &'static str,
    pub og_locale: String,
    pub og_image: Option<String>,
    pub noindex: bool,
}

impl SeoMeta {
    pub fn new(
        tenant: &TenantContext,
        scheme: &str,
        path: &str,
        title: &str,
        description: Option<&str>,
    ) -> Self {
        let profile = &tenant.profile;
        let canonical = absolute_url(scheme, tenant.canonical_host(), path);

        let mut alternates: Vec<Alternate> = profile
            .supported_locales
            .iter()
            .map(|locale| Alternate {
                hreflang: locale.to_string(),
                href: format!("{}?lang={}", canonical, locale),
            })
            .collect();
        alternates.push(Alternate {
            hreflang: "x-default".to_string(),
            href: canonical.clone(),
        });

        let description = description
            .filter(|d| !d.trim().is_empty())
            .or(profile.seo.description.as_deref())
            .unwrap_or(&profile.display_name)
            .to_string();

        Self {
            title: profile.page_title(title),
            description,
            canonical,
            alternates,
            site_name: profile.display_name.clone(),
            og_type: "website",
            og_locale: tenant.locale.as_str().replace('-', "_"),
            og_image: None,
            noindex: false,
        }
    }

    pub fn with_og_type(mut self, og_type: &'static str) -> Self {
        self.og_type = og_type;
        self
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.og_image = image;
        self
    }

    /// Carts, checkout and account pages stay out of search indexes
    pub fn noindex(mut self) -> Self {
        self.noindex = true;
        self
    }
}

pub fn absolute_url(scheme: &str, host: &str, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("{}://{}{}", scheme, host, path)
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn robots_txt(tenant: &TenantContext, scheme: &str) -> String {
    let mut body = String::from("User-agent: *\n");
    for path in ["/cart", "/checkout", "/account", "/api/", "/login", "/register"] {
        body.push_str(&format!("Disallow: {}\n", path));
    }
    body.push_str(&format!(
        "\nSitemap: {}\n",
        absolute_url(scheme, tenant.canonical_host(), "/sitemap.xml")
    ));
    body
}

/// Render a sitemap from absolute URLs
pub fn sitemap_xml(urls: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        xml.push_str(&format!("  <url><loc>{}</loc></url>\n", xml_escape(url)));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub async fn robots(ctx: PageContext) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&ctx.tenant, &ctx.state.config.public_scheme),
    )
        .into_response()
}

/// Static pages, categories, first page of products and blog posts.
///
/// Backend failures drop the affected section instead of failing the sitemap.
pub async fn sitemap(ctx: PageContext) -> Response {
    let scope = ctx.scope();
    let gateway = &ctx.state.gateway;
    let query = ProductQuery {
        page_size: storefront_egress::models::MAX_PAGE_SIZE,
        ..Default::default()
    };

    let (categories, products, posts) = tokio::join!(
        gateway.list_categories(&scope),
        gateway.list_products(&scope, &query),
        gateway.list_posts(&scope, 1),
    );

    let mut paths: Vec<String> = ["/", "/products", "/blog"]
        .into_iter()
        .map(str::to_string)
        .collect();

    match categories {
        Ok(categories) => paths.extend(categories.into_iter().map(|c| {
            format!(
                "/products?{}",
                serde_urlencoded::to_string([("category", c.slug.as_str())]).unwrap_or_default()
            )
        })),
        Err(e) => warn!(tenant = %ctx.tenant.key(), error = %e, "Sitemap: categories unavailable"),
    }
    match products {
        Ok(page) => paths.extend(page.items.into_iter().map(|p| format!("/products/{}", p.slug))),
        Err(e) => warn!(tenant = %ctx.tenant.key(), error = %e, "Sitemap: products unavailable"),
    }
    match posts {
        Ok(page) => paths.extend(page.items.into_iter().map(|p| format!("/blog/{}", p.slug))),
        Err(e) => warn!(tenant = %ctx.tenant.key(), error = %e, "Sitemap: posts unavailable"),
    }

    let scheme = &ctx.state.config.public_scheme;
    let host = ctx.tenant.canonical_host();
    let urls: Vec<String> = paths
        .iter()
        .map(|path| absolute_url(scheme, host, path))
        .collect();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        sitemap_xml(&urls),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storefront_core::{Locale, LocaleSource, TenantProfile};

    fn tenant(canonical_host: Option<&str>) -> TenantContext {
        let profile: TenantProfile = serde_json::from_value(serde_json::json!({
            "key": "acme",
            "display_name": "Acme Outdoor",
            "default_locale": "en",
            "supported_locales": ["en", "de-DE"],
            "currency": "EUR",
            "seo": {
                "title_suffix": "Acme",
                "description": "Gear for every trail",
                "canonical_host": canonical_host
            }
        }))
        .unwrap();
        TenantContext {
            profile: Arc::new(profile.validate().unwrap()),
            locale: Locale::parse("de-DE").unwrap(),
            locale_source: LocaleSource::Query,
            host: "acme.storefront.app".to_string(),
        }
    }

    #[test]
    fn test_meta_uses_canonical_host() {
        let meta = SeoMeta::new(&tenant(Some("www.acme.com")), "https", "/products", "Boots", None);
        assert_eq!(meta.title, "Boots | Acme");
        assert_eq!(meta.canonical, "https://www.acme.com/products");
        assert_eq!(meta.description, "Gear for every trail");
        assert_eq!(meta.og_locale, "de_DE");
    }

    #[test]
    fn test_meta_falls_back_to_request_host() {
        let meta = SeoMeta::new(&tenant(None), "https", "/", "", Some("Custom"));
        assert_eq!(meta.canonical, "https://acme.storefront.app/");
        assert_eq!(meta.title, "Acme");
        assert_eq!(meta.description, "Custom");
    }

    #[test]
    fn test_hreflang_alternates() {
        let meta = SeoMeta::new(&tenant(Some("www.acme.com")), "https", "/blog", "Blog", None);
        assert_eq!(
            meta.alternates,
            vec![
                Alternate {
                    hreflang: "en".to_string(),
                    href: "https://www.acme.com/blog?lang=en".to_string()
                },
                Alternate {
                    hreflang: "de-DE".to_string(),
                    href: "https://www.acme.com/blog?lang=de-DE".to_string()
                },
                Alternate {
                    hreflang: "x-default".to_string(),
                    href: "https://www.acme.com/blog".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_robots_txt() {
        let body = robots_txt(&tenant(Some("www.acme.com")), "https");
        assert!(body.starts_with("User-agent: *\n"));
        assert!(body.contains("Disallow: /checkout\n"));
        assert!(body.contains("Sitemap: https://www.acme.com/sitemap.xml"));
    }

    #[test]
    fn test_sitemap_escapes_urls() {
        let xml = sitemap_xml(&["https://a.com/products?category=x&brand=y".to_string()]);
        assert!(xml.contains("<loc>https://a.com/products?category=x&amp;brand=y</loc>"));
        assert!(xml.starts_with("<?xml"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}
