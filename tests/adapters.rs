use coinbridge::exchanges::{Bitrue, Coineal, Exchange, Fcoin};
use coinbridge::model::{Coin, Level, OrderStatus};
use coinbridge::testkit::{context, ScriptedTransport};
use coinbridge::utils::config::ExchangeConfig;
use coinbridge::Error;
use reqwest::Method;

fn with_keys() -> ExchangeConfig {
    ExchangeConfig {
        api_key: "test-key".into(),
        api_secret: "test-secret".into(),
        ..Default::default()
    }
}

const BITRUE_INFO: &str = r#"{"timezone":"UTC","serverTime":1555904408000,"symbols":[
    {"symbol":"ETHBTC","status":"TRADING","baseAsset":"ETH","quoteAsset":"BTC",
     "filters":[{"filterType":"PRICE_FILTER","minPrice":"0.000001"},{"filterType":"LOT_SIZE","minQty":"0.001"}]},
    {"symbol":"BCHSVUSDT","status":"TRADING","baseAsset":"BCHSV","quoteAsset":"USDT","filters":[]}]}"#;

#[tokio::test]
async fn bitrue_symbols_and_order_flow() {
    let transport = ScriptedTransport::new()
        .route("/api/v1/exchangeInfo", BITRUE_INFO)
        .route(
            "/api/v1/depth",
            r#"{"lastUpdateId":1,"bids":[["0.0712","3.5"]],"asks":[["0.0713","1.0"]]}"#,
        )
        .route(
            "/api/v1/order",
            r#"{"symbol":"ETHBTC","orderId":12345,"clientOrderId":"x","transactTime":1}"#,
        )
        .route(
            "/api/v1/order",
            r#"{"symbol":"ETHBTC","orderId":12345,"status":"PARTIALLY_FILLED"}"#,
        )
        .route(
            "/api/v1/order",
            r#"{"symbol":"ETHBTC","orderId":12345,"status":"CANCELED"}"#,
        );
    let (context, _) = context(&transport);
    let bitrue = Bitrue::create(context, with_keys()).await;

    let market = bitrue.core().market();
    assert_eq!(bitrue.pairs().len(), 2);
    let bsv = market.pair_by_key("USDT|BSV").unwrap();
    assert_eq!(bitrue.pair_code(&bsv), "BCHSVUSDT");

    let pair = market.pair_by_key("BTC|ETH").unwrap();
    assert_eq!(bitrue.pair_code(&pair), "ETHBTC");
    let maker = bitrue.order_book(&pair).await.unwrap();
    assert_eq!(maker.bids, vec![Level::new(0.0712, 3.5)]);
    let depth = &transport.requests_matching("/api/v1/depth")[0];
    assert!(depth.url.contains("symbol=ETHBTC"));
    assert!(depth.url.contains("limit=0"));

    let mut order = bitrue.limit_buy(&pair, 2.0, 0.0712).await.unwrap();
    assert_eq!(order.order_id.as_str(), "12345");
    assert_eq!(order.status, OrderStatus::New);

    bitrue.order_status(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Partial);

    bitrue.cancel_order(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceling);

    let sent = transport.requests_matching("/api/v1/order");
    let methods: Vec<Method> = sent.iter().map(|r| r.method.clone()).collect();
    assert_eq!(methods, vec![Method::POST, Method::GET, Method::DELETE]);
    assert!(sent[0].url.contains("side=BUY"));
    assert!(sent[0].url.contains("&signature="));
    assert!(sent[2].url.contains("orderId=12345"));
    assert_eq!(sent[0].headers["x-mbx-apikey"], "test-key");
}

#[tokio::test]
async fn bitrue_constraints_and_rejections() {
    let transport = ScriptedTransport::new()
        .route("/api/v1/exchangeInfo", BITRUE_INFO)
        .route("/api/v1/order", r#"{"code":-2010,"msg":"Account has insufficient balance"}"#);
    let (context, _) = context(&transport);
    let bitrue = Bitrue::create(context, with_keys()).await;
    let pair = bitrue.core().market().pair_by_key("BTC|ETH").unwrap();

    assert_eq!(bitrue.update_pair_constraints().await.unwrap(), 2);
    assert_eq!(bitrue.lot_size(&pair).await, 0.001);
    assert_eq!(bitrue.price_filter(&pair).await, 0.000001);

    match bitrue.limit_sell(&pair, 1.0, 0.07).await {
        Err(Error::ExchangeRejected { message, .. }) => {
            assert!(message.contains("Account has insufficient balance"))
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn bitrue_status_mismatch_leaves_order_untouched() {
    let transport = ScriptedTransport::new()
        .route("/api/v1/exchangeInfo", BITRUE_INFO)
        .route("/api/v1/order", r#"{"symbol":"ETHBTC","orderId":1}"#)
        .route("/api/v1/order", r#"{"symbol":"ETHBTC","orderId":2,"status":"FILLED"}"#);
    let (context, _) = context(&transport);
    let bitrue = Bitrue::create(context, with_keys()).await;
    let pair = bitrue.core().market().pair_by_key("BTC|ETH").unwrap();

    let mut order = bitrue.limit_buy(&pair, 1.0, 0.07).await.unwrap();
    assert!(matches!(
        bitrue.order_status(&mut order).await,
        Err(Error::Parse(_))
    ));
    assert_eq!(order.status, OrderStatus::New);
}

const COINEAL_SYMBOLS: &str = r#"{"code":"0","msg":"suc","data":[
    {"symbol":"ethbtc","count_coin":"BTC","amount_precision":3,"base_coin":"ETH","price_precision":6},
    {"symbol":"xbtc","count_coin":"BTC","amount_precision":2,"base_coin":"-","price_precision":8}]}"#;

#[tokio::test]
async fn coineal_book_orders_and_balances() {
    let transport = ScriptedTransport::new()
        .route("/open/api/common/symbols", COINEAL_SYMBOLS)
        .route(
            "/open/api/market_dept",
            r#"{"code":"0","msg":"suc","data":{"tick":{"asks":[["0.0713",2]],"bids":[[0.0712,"1.5"]],"time":1550000000000}}}"#,
        )
        .route(
            "/open/api/create_order",
            r#"{"code":"0","msg":"suc","data":{"order_id":34343}}"#,
        )
        .route(
            "/open/api/order_info",
            r#"{"code":"0","msg":"suc","data":{"order_info":{"id":34343,"status":3},"trade_list":[]}}"#,
        )
        .route("/open/api/cancel_order", r#"{"code":"0","msg":"suc","data":{}}"#)
        .route(
            "/open/api/user/account",
            r#"{"code":"0","msg":"suc","data":{"total_asset":"1","coin_list":[
                {"coin":"eth","normal":"4.2","locked":"0","btcValuatin":"0.3"},
                {"coin":"btc","normal":0.25,"locked":"0","btcValuatin":"0.25"}]}}"#,
        );
    let (context, _) = context(&transport);
    let coineal = Coineal::create(context, with_keys()).await;

    assert_eq!(coineal.pairs().len(), 1);
    let pair = coineal.core().market().pair_by_key("BTC|ETH").unwrap();
    assert_eq!(coineal.pair_code(&pair), "ethbtc");

    let maker = coineal.order_book(&pair).await.unwrap();
    assert_eq!(maker.bids, vec![Level::new(0.0712, 1.5)]);
    assert_eq!(maker.asks, vec![Level::new(0.0713, 2.0)]);
    assert_eq!(maker.timestamp, 1_550_000_000_000.0);

    let mut order = coineal.limit_buy(&pair, 1.0, 0.0712).await.unwrap();
    assert_eq!(order.order_id.as_str(), "34343");
    let placed = &transport.requests_matching("/open/api/create_order")[0];
    let body = placed.body.as_deref().unwrap();
    assert!(body.contains("api_key=test-key"));
    assert!(body.contains("sign="));
    assert!(body.contains("side=BUY"));

    coineal.order_status(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Partial);
    coineal.cancel_order(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceling);

    coineal.update_all_balances().await;
    assert_eq!(coineal.balance(&Coin::new("ETH")), 4.2);
    assert_eq!(coineal.balance(&Coin::new("BTC")), 0.25);
}

#[tokio::test]
async fn coineal_error_code_is_rejection() {
    let transport = ScriptedTransport::new()
        .route("/open/api/common/symbols", COINEAL_SYMBOLS)
        .route(
            "/open/api/create_order",
            r#"{"code":"10","msg":"Insufficient balance","data":null}"#,
        );
    let (context, _) = context(&transport);
    let coineal = Coineal::create(context, with_keys()).await;
    let pair = coineal.core().market().pair_by_key("BTC|ETH").unwrap();

    match coineal.limit_buy(&pair, 1.0, 0.07).await {
        Err(Error::ExchangeRejected { exchange, message }) => {
            assert_eq!(exchange, "Coineal");
            assert!(message.contains("Insufficient balance"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn fcoin_flat_depth_and_orders() {
    let transport = ScriptedTransport::new()
        .route(
            "public/currencies",
            r#"{"status":0,"data":["btc","eth","usdt"]}"#,
        )
        .route(
            "public/symbols",
            r#"{"status":0,"data":[{"name":"ethusdt","base_currency":"eth","quote_currency":"usdt","price_decimal":2,"amount_decimal":4}]}"#,
        )
        .route(
            "market/depth/L150/ethusdt",
            r#"{"status":0,"data":{"bids":[5.1,2.0,5.0,1.0],"asks":[5.2,0.5],"ts":1523693784042,"seq":1,"type":"depth.L150.ethusdt"}}"#,
        )
        .route(
            "/orders/6TfBZ-eORp4_2nO5ar6z000gLLvuWzTTmL1OzOy9OYg=/submit-cancel",
            r#"{"status":0}"#,
        )
        .route(
            "/orders/6TfBZ-eORp4_2nO5ar6z000gLLvuWzTTmL1OzOy9OYg=",
            r#"{"status":0,"data":{"id":"6TfBZ-eORp4_2nO5ar6z000gLLvuWzTTmL1OzOy9OYg=","state":"partial_filled"}}"#,
        )
        .route(
            "/orders",
            r#"{"status":0,"data":"6TfBZ-eORp4_2nO5ar6z000gLLvuWzTTmL1OzOy9OYg="}"#,
        );
    let (context, _) = context(&transport);
    let fcoin = Fcoin::create(context, with_keys()).await;

    assert_eq!(fcoin.coins().len(), 3);
    let pair = fcoin.core().market().pair_by_key("USDT|ETH").unwrap();
    assert_eq!(fcoin.pair_code(&pair), "ethusdt");

    let maker = fcoin.order_book(&pair).await.unwrap();
    assert_eq!(maker.bids, vec![Level::new(5.1, 2.0), Level::new(5.0, 1.0)]);
    assert_eq!(maker.asks, vec![Level::new(5.2, 0.5)]);
    assert_eq!(maker.timestamp, 1_523_693_784_042.0);

    let mut order = fcoin.limit_sell(&pair, 0.5, 5.2).await.unwrap();
    assert_eq!(order.order_id.as_str(), "6TfBZ-eORp4_2nO5ar6z000gLLvuWzTTmL1OzOy9OYg=");
    let placed = transport.requests().into_iter().last().unwrap();
    assert_eq!(placed.method, Method::POST);
    assert!(placed.headers.contains_key("fc-access-signature"));
    assert!(placed.body.unwrap().contains(r#""side":"sell""#));

    fcoin.order_status(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Partial);
    fcoin.cancel_order(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Canceling);

    assert_eq!(fcoin.update_pair_constraints().await.unwrap(), 1);
    assert!((fcoin.lot_size(&pair).await - 0.0001).abs() < 1e-12);
    assert!((fcoin.price_filter(&pair).await - 0.01).abs() < 1e-12);
}

#[tokio::test]
async fn bitrue_and_coineal_have_no_withdrawal() {
    let transport = ScriptedTransport::new()
        .route("/api/v1/exchangeInfo", BITRUE_INFO)
        .route("/open/api/common/symbols", COINEAL_SYMBOLS);
    let (context, _) = context(&transport);
    let bitrue = Bitrue::create(context.clone(), with_keys()).await;
    let coineal = Coineal::create(context, with_keys()).await;
    let eth = Coin::new("ETH");

    match bitrue.withdraw(&eth, 1.0, "0xabc", "").await {
        Err(Error::Unsupported { exchange, operation }) => {
            assert_eq!(exchange, "Bitrue");
            assert_eq!(operation, "withdraw");
        }
        other => panic!("expected unsupported, got {other:?}"),
    }
    assert!(matches!(
        coineal.withdraw(&eth, 1.0, "0xabc", "").await,
        Err(Error::Unsupported { .. })
    ));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn coineal_mismatch_and_cancel_rejection_leave_order_untouched() {
    let transport = ScriptedTransport::new()
        .route("/open/api/common/symbols", COINEAL_SYMBOLS)
        .route(
            "/open/api/create_order",
            r#"{"code":"0","msg":"suc","data":{"order_id":100}}"#,
        )
        .route(
            "/open/api/order_info",
            r#"{"code":"0","msg":"suc","data":{"order_info":{"id":200,"status":2}}}"#,
        )
        .route(
            "/open/api/cancel_order",
            r#"{"code":"8","msg":"order already finished","data":null}"#,
        );
    let (context, _) = context(&transport);
    let coineal = Coineal::create(context, with_keys()).await;
    let pair = coineal.core().market().pair_by_key("BTC|ETH").unwrap();

    let mut order = coineal.limit_sell(&pair, 1.0, 0.07).await.unwrap();
    assert!(matches!(
        coineal.order_status(&mut order).await,
        Err(Error::Parse(_))
    ));
    assert_eq!(order.status, OrderStatus::New);

    match coineal.cancel_order(&mut order).await {
        Err(Error::ExchangeRejected { message, .. }) => {
            assert!(message.contains("order already finished"))
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(order.status, OrderStatus::New);
    let cancel = &transport.requests_matching("/open/api/cancel_order")[0];
    assert!(cancel.body.as_deref().unwrap().contains("order_id=100"));
}

#[tokio::test]
async fn coineal_symbol_without_precision_keeps_minimum() {
    let transport = ScriptedTransport::new().route(
        "/open/api/common/symbols",
        r#"{"code":"0","msg":"suc","data":[
            {"symbol":"ethbtc","count_coin":"BTC","base_coin":"ETH","price_precision":6}]}"#,
    );
    let (context, _) = context(&transport);
    let coineal = Coineal::create(context, with_keys()).await;
    let pair = coineal.core().market().pair_by_key("BTC|ETH").unwrap();

    assert_eq!(coineal.update_pair_constraints().await.unwrap(), 1);
    assert_eq!(coineal.lot_size(&pair).await, 0.000_000_01);
    assert!((coineal.price_filter(&pair).await - 0.000_001).abs() < 1e-15);
}

const FCOIN_CURRENCIES: &str = r#"{"status":0,"data":["btc","eth","usdt"]}"#;

#[tokio::test]
async fn fcoin_mismatch_and_cancel_rejection_leave_order_untouched() {
    let transport = ScriptedTransport::new()
        .route("public/currencies", FCOIN_CURRENCIES)
        .route(
            "public/symbols",
            r#"{"status":0,"data":[{"name":"ethusdt","base_currency":"eth","quote_currency":"usdt","price_decimal":2,"amount_decimal":4}]}"#,
        )
        .route(
            "/orders/order-a/submit-cancel",
            r#"{"status":3008,"msg":"submit cancel invalid order state"}"#,
        )
        .route(
            "/orders/order-a",
            r#"{"status":0,"data":{"id":"order-b","state":"filled"}}"#,
        )
        .route("/orders", r#"{"status":0,"data":"order-a"}"#);
    let (context, _) = context(&transport);
    let fcoin = Fcoin::create(context, with_keys()).await;
    let pair = fcoin.core().market().pair_by_key("USDT|ETH").unwrap();

    let mut order = fcoin.limit_buy(&pair, 1.0, 5.0).await.unwrap();
    assert_eq!(order.order_id.as_str(), "order-a");
    assert!(matches!(
        fcoin.order_status(&mut order).await,
        Err(Error::Parse(_))
    ));
    assert_eq!(order.status, OrderStatus::New);

    match fcoin.cancel_order(&mut order).await {
        Err(Error::ExchangeRejected { exchange, message }) => {
            assert_eq!(exchange, "Fcoin");
            assert!(message.contains("submit cancel invalid order state"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(order.status, OrderStatus::New);
}

#[tokio::test]
async fn fcoin_symbol_without_precision_keeps_minimum() {
    let transport = ScriptedTransport::new()
        .route("public/currencies", FCOIN_CURRENCIES)
        .route(
            "public/symbols",
            r#"{"status":0,"data":[{"name":"ethusdt","base_currency":"eth","quote_currency":"usdt"}]}"#,
        );
    let (context, _) = context(&transport);
    let fcoin = Fcoin::create(context, with_keys()).await;
    let pair = fcoin.core().market().pair_by_key("USDT|ETH").unwrap();

    assert_eq!(fcoin.update_pair_constraints().await.unwrap(), 1);
    assert_eq!(fcoin.lot_size(&pair).await, 0.000_000_01);
    assert_eq!(fcoin.price_filter(&pair).await, 0.000_000_01);
}

#[tokio::test]
async fn fcoin_withdraw_is_signed_and_surfaces_rejection() {
    let transport = ScriptedTransport::new()
        .route("public/currencies", FCOIN_CURRENCIES)
        .route("public/symbols", r#"{"status":0,"data":[]}"#)
        .route(
            "broker/otc/assets/transfer/out",
            r#"{"status":0,"data":"transfer-1"}"#,
        )
        .route(
            "broker/otc/assets/transfer/out",
            r#"{"status":1016,"msg":"account balance insufficient"}"#,
        );
    let (context, _) = context(&transport);
    let btc = Coin::new("BTC");

    let anonymous = Fcoin::create(context.clone(), ExchangeConfig::default()).await;
    assert!(matches!(
        anonymous.withdraw(&btc, 0.5, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT", "").await,
        Err(Error::Auth(_))
    ));
    assert!(transport
        .requests_matching("broker/otc/assets/transfer/out")
        .is_empty());

    let fcoin = Fcoin::create(context, with_keys()).await;
    fcoin
        .withdraw(&btc, 0.5, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT", "")
        .await
        .unwrap();
    let sent = &transport.requests_matching("broker/otc/assets/transfer/out")[0];
    assert_eq!(sent.method, Method::POST);
    assert!(sent.headers.contains_key("fc-access-signature"));
    let body = sent.body.as_deref().unwrap();
    assert!(body.contains(r#""currency":"btc""#));
    assert!(body.contains(r#""amount":"0.5""#));

    match fcoin.withdraw(&btc, 0.5, "1BoatSLRHtKNngkdXEeobR76b53LETtpyT", "").await {
        Err(Error::ExchangeRejected { message, .. }) => {
            assert!(message.contains("account balance insufficient"))
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
