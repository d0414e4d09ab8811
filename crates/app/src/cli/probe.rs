use trellis_app::{errors::DiscountError, store::ShopInfo};

use super::{Output, StoreArgs, table};

pub(crate) async fn run(args: StoreArgs, output: Output) -> Result<(), String> {
    let retry = args.reconcile.retry_policy();
    let context = args.context()?;

    let shop = retry
        .run("read_shop_info", || context.store.read_shop_info())
        .await
        .map_err(|error| output.failure(&DiscountError::from(error)))?;

    output.print(&shop, |shop: &ShopInfo| {
        table::fields([
            ("Shop", shop.name.clone()),
            ("Currency", shop.currency_code.clone()),
            (
                "Plan",
                shop.plan_name.clone().unwrap_or_else(|| "-".to_string()),
            ),
        ])
    })
}
