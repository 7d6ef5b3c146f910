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
        auth::{LoginRequest, SignupRequest, TokenResponse},
        cart::{AddToCartRequest, CartItemView, CartView, CheckoutRequest, RemoveFromCartRequest},
        customers::{
            AddressList, CreateAddressRequest, CreateCustomerRequest, CustomerDetail,
            CustomerList, UpdateCustomerRequest,
        },
        orders::{CreateOrderRequest, OrderList, OrderView},
        products::{
            AddProductImageRequest, CreateProductRequest, ProductDetail, ProductList,
            UpdateProductRequest,
        },
        vendors::{RegisterVendorRequest, UpdateVendorRequest, VendorList},
    },
    models::{Address, Cart, CartItem, Customer, Order, OrderItem, Product, ProductImage, User, Vendor},
    response::{ApiResponse, ErrorBody, Meta},
    routes::{auth, cart, customers, health, orders, params, products, vendors},
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
        auth::signup,
        auth::confirm,
        auth::login,
        auth::get_token,
        vendors::list_vendors,
        vendors::register_vendor,
        vendors::get_vendor,
        vendors::update_vendor,
        vendors::delete_vendor,
        customers::list_customers,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        customers::list_addresses,
        customers::create_address,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_product_image,
        cart::cart_detail,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::checkout,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
    ),
    components(
        schemas(
            User,
            Vendor,
            Customer,
            Address,
            Product,
            ProductImage,
            Cart,
            CartItem,
            Order,
            OrderItem,
            SignupRequest,
            LoginRequest,
            TokenResponse,
            RegisterVendorRequest,
            UpdateVendorRequest,
            VendorList,
            CreateCustomerRequest,
            UpdateCustomerRequest,
            CreateAddressRequest,
            CustomerDetail,
            CustomerList,
            AddressList,
            CreateProductRequest,
            UpdateProductRequest,
            AddProductImageRequest,
            ProductDetail,
            ProductList,
            AddToCartRequest,
            RemoveFromCartRequest,
            CheckoutRequest,
            CartItemView,
            CartView,
            CreateOrderRequest,
            OrderView,
            OrderList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ErrorBody,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderView>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, confirmation and token endpoints"),
        (name = "Vendors", description = "Vendor endpoints"),
        (name = "Customers", description = "Customer and address endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Cart", description = "Cart and checkout endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
