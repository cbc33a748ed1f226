//! Worked market scenarios with known outcomes

use std::sync::Arc;

use market_core::{
    ConvergenceError, DemandCurve, DemandLevel, Equilibrium, EquilibriumSolver, Good,
    GoodsCatalog, Market, MarketConfig, MarketQuote, MarketUpdater, Region, SolveError,
    SolverConfig, SupplyCurve, SupplyLevel, World, solve_equilibrium,
};

#[test]
fn wood_clears_at_half_its_base_price() {
    let eq = solve_equilibrium(&DemandCurve::new(15.0, 7.5), &SupplyCurve::new(15.0, 7.5)).unwrap();
    assert!((eq.price - 15.0).abs() < 1e-9);
    assert!((eq.fraction - 0.5).abs() < 1e-9);

    let mut quote = MarketQuote::new(30, 100);
    quote.apply(&eq);
    assert_eq!((quote.current_price, quote.current_quantity), (15, 50));
    assert_eq!((quote.previous_price, quote.previous_quantity), (30, 100));
}

#[test]
fn eager_buyers_clear_most_of_the_stock() {
    let eq = solve_equilibrium(&DemandCurve::new(50.0, 10.0), &SupplyCurve::new(20.0, 10.0)).unwrap();
    assert!((eq.price - 35.0).abs() < 1e-7);
    // Phi(1.5)
    assert!((eq.fraction - 0.933_192_8).abs() < 1e-6);

    let mut quote = MarketQuote::new(40, 100);
    quote.apply(&eq);
    assert_eq!((quote.current_price, quote.current_quantity), (35, 93));
}

#[test]
fn fraction_scales_yesterdays_stock() {
    let mut quote = MarketQuote::new(12, 100);
    quote.apply(&Equilibrium {
        price: 11.6,
        fraction: 0.42,
        iterations: 5,
    });
    assert_eq!(quote.current_price, 12);
    assert_eq!(quote.current_quantity, 42);
    assert_eq!(quote.previous_quantity, 100);
}

#[test]
fn seed_far_above_the_crossing() {
    let solver = EquilibriumSolver::new(SolverConfig {
        initial_guess: 500.0,
        ..SolverConfig::default()
    });
    let eq = solver
        .solve(&DemandCurve::new(40.0, 5.0), &SupplyCurve::new(20.0, 5.0))
        .unwrap();
    assert!((eq.price - 30.0).abs() < 1e-7);
}

#[test]
fn negative_crossing_is_clamped_to_a_free_good() {
    let eq = solve_equilibrium(&DemandCurve::new(-10.0, 2.0), &SupplyCurve::new(-2.0, 2.0)).unwrap();
    assert!((eq.price + 6.0).abs() < 1e-7);

    let catalog = Arc::new(GoodsCatalog::hanseatic());
    let updater = MarketUpdater::new(catalog.clone(), EquilibriumSolver::default(), Some(100));
    let mut market = Market::stocked(&catalog, 100);

    let report = updater.commit("kampen", 3, &mut market, vec![(Good::Pitch, Ok(eq))]);
    assert_eq!(report.updated, 1);
    assert_eq!(report.clamped.len(), 1);
    assert_eq!(report.clamped[0].good, Good::Pitch);
    assert!((report.clamped[0].raw_price + 6.0).abs() < 1e-7);

    let pitch = market.quote(Good::Pitch).unwrap();
    assert_eq!(pitch.current_price, 0);
    assert_eq!(pitch.previous_price, 80);
}

#[test]
fn curves_too_far_apart_are_reported_not_guessed() {
    let err = solve_equilibrium(&DemandCurve::new(0.0, 1.0), &SupplyCurve::new(1000.0, 1.0)).unwrap_err();
    assert!(matches!(
        err,
        SolveError::Convergence(ConvergenceError::Degenerate { .. })
    ));
}

#[test]
fn market_levels_shift_the_price() {
    let catalog = Arc::new(GoodsCatalog::hanseatic());
    let updater = MarketUpdater::new(catalog.clone(), EquilibriumSolver::default(), Some(100));
    let mut market = Market::stocked(&catalog, 100);

    // Iron: both curves centre on 50 with spread 25
    let iron = market.quote_mut(Good::Iron).unwrap();
    iron.demand_level = DemandLevel::Extreme;
    let salt = market.quote_mut(Good::Salt).unwrap();
    salt.supply_level = SupplyLevel::Extreme;

    updater.update("stockholm", 1, &mut market);

    // Demand mean 100, supply mean 50 -> crossing midway
    let iron = market.quote(Good::Iron).unwrap();
    assert_eq!(iron.current_price, 75);
    assert!(iron.current_quantity > 50);

    // Salt: supply mean 25 / 2 = 12.5, demand mean 25 -> 18.75
    let salt = market.quote(Good::Salt).unwrap();
    assert_eq!(salt.current_price, 19);
    assert!(salt.current_quantity > 50);
}

#[test]
fn small_world_from_json() {
    let catalog = GoodsCatalog::from_json(
        r#"{
            "herring": { "category": "fishing", "base_price": 40.0 }
        }"#,
    );
    // Only the fixed goods list is accepted
    assert!(catalog.is_err());

    let catalog = GoodsCatalog::from_json(
        r#"{
            "fish": { "category": "fishing", "base_price": 40.0, "demand_spread": 5.0, "supply_spread": 15.0 },
            "salt": { "category": "fishing", "base_price": 50.0 }
        }"#,
    )
    .unwrap();
    let config = MarketConfig::from_json(r#"{ "initial_quantity": 60, "restock": 60 }"#).unwrap();

    let mut world = World::new(config, catalog);
    let bergen = world.add_city("bergen", Region::NorthSea);
    assert_eq!(world.city(bergen).unwrap().market.len(), 2);

    let report = world.advance_day();
    assert_eq!(report.updated, 2);

    let market = &world.city(bergen).unwrap().market;
    // Same means, different spreads: still crosses at the mean
    let fish = market.quote(Good::Fish).unwrap();
    assert_eq!((fish.current_price, fish.current_quantity), (20, 30));
    let salt = market.quote(Good::Salt).unwrap();
    assert_eq!((salt.current_price, salt.current_quantity), (25, 30));
}

#[test]
fn a_season_of_trading() {
    let mut world = World::hanseatic(MarketConfig::default());
    let lubeck = world.city_by_name("lubeck").unwrap();
    let tallinn = world.city_by_name("tallinn").unwrap();
    let klaus = world.add_player("klaus", lubeck).unwrap();

    world.advance_day();
    world.buy(klaus, Good::Cheese, 5).unwrap();
    world.relocate_player(klaus, tallinn).unwrap();
    world.advance_day();
    world.sell(klaus, Good::Cheese, 5).unwrap();

    let player = world.player(klaus).unwrap();
    assert_eq!(player.gold, 1000);
    assert_eq!(player.holding(Good::Cheese).quantity, 0);
    assert_eq!(player.holding(Good::Cheese).last_purchase_price, 100);
    assert_eq!(player.holding(Good::Cheese).last_sale_price, 100);
    assert_eq!(player.holding(Good::Wine).last_seen_price, 75);
}
