use common::{ProductCategoryId, ProductId, ProductVariantId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Cart, CartDiscount, CartService, Currency, Money, NewCartItem, NewProductVariant, Product,
    ProductService, ShippingInformation,
};
use store::InMemoryAggregateStore;

fn usd(amount: i64) -> Money {
    Money::new(amount, Currency::USD)
}

fn cart_item(n: i64) -> NewCartItem {
    NewCartItem::new(
        ProductId::new(),
        ProductVariantId::new(),
        format!("Product {n}"),
        "Default",
        format!("SKU-{n:03}"),
        1,
        usd(100 * n),
    )
}

fn cart_with_items(count: i64) -> Cart {
    let mut cart = Cart::create_guest("bench-session", Currency::USD).unwrap();
    for n in 1..=count {
        cart.add_item(cart_item(n)).unwrap();
    }
    cart
}

fn bench_cart_add_item(c: &mut Criterion) {
    c.bench_function("domain/cart_add_50_items", |b| {
        b.iter(|| cart_with_items(50));
    });
}

fn bench_cart_total(c: &mut Criterion) {
    let mut cart = cart_with_items(100);
    cart.apply_discount(CartDiscount::percentage("SAVE10", 10.0, "").unwrap())
        .unwrap();
    cart.update_shipping(ShippingInformation::new("standard", usd(599)).unwrap())
        .unwrap();

    c.bench_function("domain/cart_totals_100_items", |b| {
        b.iter(|| cart.totals());
    });
}

fn bench_product_variants(c: &mut Criterion) {
    c.bench_function("domain/product_create_20_variants", |b| {
        b.iter(|| {
            let mut product =
                Product::create("Bench Tee", "bench-tee", "", vec![ProductCategoryId::new()])
                    .unwrap();
            for n in 1..=20 {
                product
                    .create_variant(
                        NewProductVariant::new(format!("Size {n}"), format!("TEE-{n:02}"), usd(1500))
                            .with_inventory(10),
                    )
                    .unwrap();
            }
            product.summary()
        });
    });
}

fn bench_snapshot_round_trip(c: &mut Criterion) {
    let cart = cart_with_items(50);

    c.bench_function("domain/cart_snapshot_50_items", |b| {
        b.iter(|| {
            let json = serde_json::to_value(&cart).unwrap();
            serde_json::from_value::<Cart>(json).unwrap()
        });
    });
}

fn bench_service_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/cart_create_add_complete", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = CartService::new(InMemoryAggregateStore::new());
                let cart_id = service
                    .create_guest_cart("bench-session")
                    .await
                    .unwrap()
                    .aggregate
                    .id();
                service.add_item(cart_id, cart_item(1)).await.unwrap();
                service.add_item(cart_id, cart_item(2)).await.unwrap();
                service.complete(cart_id).await.unwrap();
            });
        });
    });

    c.bench_function("domain/product_create_publish", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = ProductService::new(InMemoryAggregateStore::new());
                let product_id = service
                    .create_product("Bench Tee", "bench-tee", "", vec![])
                    .await
                    .unwrap()
                    .aggregate
                    .id();
                service
                    .add_variant(product_id, NewProductVariant::new("M", "TEE-M", usd(1500)))
                    .await
                    .unwrap();
                service.publish(product_id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_cart_add_item,
    bench_cart_total,
    bench_product_variants,
    bench_snapshot_round_trip,
    bench_service_cycle,
);
criterion_main!(benches);
