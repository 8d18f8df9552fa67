#[cfg(test)]
mod tests {
    use super::super::agent::*;
    use super::super::behavior::*;
    use super::super::simulation::MarketVariables;
    use super::super::types::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn retail_agent(id: u32, satisfaction: f64) -> AgentState {
        AgentState {
            id: AgentId(id),
            client_id: format!("R_{id}"),
            kind: ClientKind::Retail(RetailProfile {
                age: 35,
                monthly_income: dec!(3000),
                education: EducationLevel::University,
                sector: EmploymentSector::Services,
                risk_tolerance: 0.6,
                price_sensitivity: 0.5,
                product_appetite: 0.7,
            }),
            governorate: "Tunis".to_string(),
            satisfaction,
            trust: 0.7,
            loyalty: 1.0,
            digital_engagement: 0.7,
            status: AgentStatus::Active,
            products: BTreeSet::from([Product::CurrentAccount]),
            channels: ChannelMix::centered_on(Channel::Branch),
            peers: Vec::new(),
            influence: 0.5,
            susceptibility: 0.5,
            evaluation_period: 5,
            pending_experiences: Vec::new(),
            last_delta: 0.0,
        }
    }

    fn corporate_agent(id: u32) -> AgentState {
        AgentState {
            id: AgentId(id),
            client_id: format!("C_{id}"),
            kind: ClientKind::Corporate(CorporateProfile {
                company_name: "Acme".to_string(),
                sector: BusinessSector::Technology,
                size: CompanySize::Medium,
                annual_revenue: dec!(2000000),
                digital_maturity: 0.8,
                relationship_quality: 0.6,
                growth_orientation: 0.8,
                cash_flow_stability: 0.4,
            }),
            governorate: "Tunis".to_string(),
            satisfaction: 0.6,
            trust: 0.7,
            loyalty: 1.0,
            digital_engagement: 0.8,
            status: AgentStatus::Active,
            products: BTreeSet::from([Product::BusinessChecking]),
            channels: ChannelMix::centered_on(Channel::Online),
            peers: Vec::new(),
            influence: 0.5,
            susceptibility: 0.3,
            evaluation_period: 7,
            pending_experiences: Vec::new(),
            last_delta: 0.0,
        }
    }

    #[test]
    fn test_churn_probability_step_function() {
        // Base probabilities at loyalty 0.
        assert_eq!(churn_probability(0.2, 0.0), CHURN_PROB_LOW);
        assert_eq!(churn_probability(0.4, 0.0), CHURN_PROB_MID);
        assert_eq!(churn_probability(0.8, 0.0), CHURN_PROB_BASE);
        // Loyalty scales the whole thing down.
        assert_eq!(churn_probability(0.2, 1.0), 0.0);
        assert!((churn_probability(0.2, 0.5) - CHURN_PROB_LOW * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_satisfaction_moves_toward_good_experiences() {
        let mut agent = retail_agent(0, 0.2);
        agent.pending_experiences = vec![1.0, 1.0, 1.0];
        let market = MarketVariables::default();
        let mut rng = StdRng::seed_from_u64(3);

        // Step 1 with period 5 and id 0 skips the portfolio/churn branch.
        step_agent(&mut agent, 1, &market, &mut rng);

        // Expected move: 0.1 * (1.0 - 0.2) = 0.08, which dominates the
        // worst-case noise terms (drift 0.02 + perturbation 0.05).
        assert!(agent.satisfaction > 0.2);
        assert!(agent.satisfaction < 0.4);
        assert!(agent.pending_experiences.is_empty());
    }

    #[test]
    fn test_recent_experiences_weigh_more() {
        // Same samples in different order, same rng seed: only the ramp
        // weighting can make the outcomes differ.
        let market = MarketVariables::default();

        let mut recent_low = retail_agent(0, 0.5);
        recent_low.pending_experiences = vec![0.9, 0.2, 0.2];
        let mut rng = StdRng::seed_from_u64(3);
        step_agent(&mut recent_low, 1, &market, &mut rng);

        let mut recent_high = retail_agent(0, 0.5);
        recent_high.pending_experiences = vec![0.2, 0.2, 0.9];
        let mut rng = StdRng::seed_from_u64(3);
        step_agent(&mut recent_high, 1, &market, &mut rng);

        assert!(recent_high.satisfaction > recent_low.satisfaction);
    }

    #[test]
    fn test_satisfaction_stays_bounded_over_long_runs() {
        let market = MarketVariables::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut agent = retail_agent(0, 0.95);
        for step in 0..300 {
            if !agent.is_active() {
                break;
            }
            agent.pending_experiences.push(1.0);
            step_agent(&mut agent, step, &market, &mut rng);
            assert!(agent.satisfaction >= 0.0 && agent.satisfaction <= 1.0);
            assert!((agent.channels.sum() - 1.0).abs() < 1e-6);
        }

        let mut grumpy = retail_agent(1, 0.05);
        for step in 0..300 {
            if !grumpy.is_active() {
                break;
            }
            grumpy.pending_experiences.push(0.0);
            step_agent(&mut grumpy, step, &market, &mut rng);
            assert!(grumpy.satisfaction >= 0.0 && grumpy.satisfaction <= 1.0);
        }
    }

    #[test]
    fn test_core_product_never_dropped() {
        let market = MarketVariables::default();
        let mut rng = StdRng::seed_from_u64(17);

        // Rock-bottom satisfaction maximizes the drop probability; full
        // loyalty keeps the agent from churning out of the test.
        let mut agent = retail_agent(0, 0.0);
        for step in 0..500 {
            step_agent(&mut agent, step, &market, &mut rng);
        }
        assert!(agent.owns(Product::CurrentAccount));

        let mut corporate = corporate_agent(1);
        corporate.satisfaction = 0.0;
        for step in 0..500 {
            step_agent(&mut corporate, step, &market, &mut rng);
        }
        assert!(corporate.owns(Product::BusinessChecking));
    }

    #[test]
    fn test_drop_product_refuses_core() {
        let mut agent = retail_agent(0, 0.5);
        assert!(!agent.drop_product(Product::CurrentAccount));
        assert!(agent.owns(Product::CurrentAccount));

        agent.adopt_product(Product::SavingsAccount);
        assert!(agent.drop_product(Product::SavingsAccount));
        assert!(!agent.owns(Product::SavingsAccount));
    }

    #[test]
    fn test_retail_unmet_needs_follow_profile() {
        let agent = retail_agent(0, 0.5);
        let ClientKind::Retail(profile) = agent.kind.clone() else {
            unreachable!();
        };
        let needs = retail_unmet_needs(&agent, &profile);

        assert!(needs.contains(&Product::SavingsAccount));
        assert!(needs.contains(&Product::CreditCard));
        assert!(needs.contains(&Product::MobileBanking));
        // Income 3000 < 3500 gate for investments.
        assert!(!needs.contains(&Product::InvestmentAccount));
    }

    #[test]
    fn test_corporate_needs_follow_profile() {
        let agent = corporate_agent(0);
        let ClientKind::Corporate(profile) = agent.kind.clone() else {
            unreachable!();
        };
        let needs = corporate_needs(&agent, &profile);
        let products: Vec<Product> = needs.iter().map(|(p, _)| *p).collect();

        // Low cash-flow stability, high growth, high digital maturity,
        // revenue over a million.
        assert!(products.contains(&Product::BusinessCreditLine));
        assert!(products.contains(&Product::TermLoan));
        assert!(products.contains(&Product::CorporateOnlineBanking));
        assert!(products.contains(&Product::TradeFinance));
    }

    #[test]
    fn test_channel_mix_shift_keeps_weights_normalized() {
        let mut mix = ChannelMix::centered_on(Channel::Branch);
        assert!((mix.sum() - 1.0).abs() < 1e-6);

        mix.shift(Channel::Branch, Channel::Mobile, 0.3);
        assert!((mix.sum() - 1.0).abs() < 1e-6);
        assert!(mix.weight(Channel::Mobile) > 0.3);

        // Shifting more than the source holds moves only what is there.
        mix.shift(Channel::Atm, Channel::Online, 5.0);
        assert!((mix.sum() - 1.0).abs() < 1e-6);
        assert!(mix.weight(Channel::Atm).abs() < 1e-9);
    }

    #[test]
    fn test_churned_agent_is_terminal() {
        let mut agent = retail_agent(0, 0.1);
        agent.churn();
        assert!(!agent.is_active());
        assert_eq!(agent.status, AgentStatus::Churned);
    }
}
