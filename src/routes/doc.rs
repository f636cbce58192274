use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        address::{AddressBookDto, AddressDto, AddressRequest},
        auth::{RefreshRequest, TokenPair},
        cart::{CartItemDto, CartView},
        orders::{OrderDto, PaymentDto},
        products::{CreateProductRequest, ProductDto, ProductList},
    },
    response::{ApiResponse, Meta},
    routes::{address, auth, cart, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::refresh,
        products::list_products,
        products::search_products,
        products::create_product,
        cart::list_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::buy_from_cart,
        orders::instant_buy,
        address::add_address,
        address::edit_home_address,
        address::edit_work_address,
        address::delete_address
    ),
    components(
        schemas(
            AddressRequest,
            AddressDto,
            AddressBookDto,
            RefreshRequest,
            TokenPair,
            CartItemDto,
            CartView,
            OrderDto,
            PaymentDto,
            CreateProductRequest,
            ProductDto,
            ProductList,
            params::Pagination,
            health::HealthData,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<OrderDto>,
            ApiResponse<ProductList>,
            ApiResponse<AddressDto>,
            ApiResponse<AddressBookDto>,
            ApiResponse<TokenPair>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Session token endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Cart", description = "Cart and checkout endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Addresses", description = "Home and work address endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
