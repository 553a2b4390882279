// Demo driver for the ledger library
use architect_ledger::{
    Block, Blockchain, Command, MiningSignal, Opt, UTXOSet, Wallet, GLOBAL_CONFIG,
};
use clap::Parser;
use log::error;
use std::process;
use std::time::Duration;

const ORIGIN_COINS: u64 = 100;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &opt.config {
        GLOBAL_CONFIG.load_from_file(path)?;
    }

    match opt.command {
        Command::Demo { difficulty, json } => {
            let difficulty = difficulty.unwrap_or_else(|| GLOBAL_CONFIG.get_difficulty());
            let chain = run_demo(difficulty)?;
            if json {
                println!("{}", chain.to_json_pretty()?);
            }
        }
        Command::Mine {
            blocks,
            difficulty,
            timeout_secs,
        } => {
            let difficulty = difficulty.unwrap_or_else(|| GLOBAL_CONFIG.get_difficulty());
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .or_else(|| GLOBAL_CONFIG.get_mining_timeout());

            let chain = Blockchain::with_difficulty(difficulty)?;
            chain.initialize_chain()?;
            for _ in 0..blocks {
                let block = Block::new_block(&chain.next_pre_block_hash())?;
                let mined = chain.append_with_signal(block, &mining_signal(timeout))?;
                println!("Mined block {} (nonce {})", mined.get_hash(), mined.get_nonce());
            }
            println!("Chain of {} blocks, valid: {}", chain.len(), chain.is_valid());
        }
    }
    Ok(())
}

fn mining_signal(timeout: Option<Duration>) -> MiningSignal {
    match timeout {
        Some(timeout) => MiningSignal::with_timeout(timeout),
        None => MiningSignal::new(),
    }
}

// Bank mints coins for A, A pays B, A overspends and is refused, B pays A back
fn run_demo(difficulty: u32) -> Result<Blockchain, Box<dyn std::error::Error>> {
    let timeout = GLOBAL_CONFIG.get_mining_timeout();
    let ledger = UTXOSet::new();
    let chain = Blockchain::with_difficulty(difficulty)?;

    let mut bank = Wallet::new("Bank", &ledger)?;
    let mut wallet_a = Wallet::new("Wallet A", &ledger)?;
    let mut wallet_b = Wallet::new("Wallet B", &ledger)?;

    chain.add_origin_transaction(
        &ledger,
        bank.get_address(),
        wallet_a.get_address(),
        ORIGIN_COINS,
    )?;
    print_balances("Money from thin air", &mut [&mut bank, &mut wallet_a, &mut wallet_b]);

    let mut block = Block::new_block(&chain.next_pre_block_hash())?;
    let tx = wallet_a.send_coins(wallet_b.get_address(), 40)?;
    block.try_add_transaction(tx, &ledger)?;
    chain.append_with_signal(block, &mining_signal(timeout))?;
    print_balances("Wallet A pays Wallet B 40", &mut [&mut bank, &mut wallet_a, &mut wallet_b]);

    let block = Block::new_block(&chain.next_pre_block_hash())?;
    match wallet_a.send_coins(wallet_b.get_address(), 1000) {
        Ok(_) => return Err("Overspending transaction was not refused".into()),
        Err(e) => println!("Wallet A tries to pay 1000: {e}"),
    }
    chain.append_with_signal(block, &mining_signal(timeout))?;
    print_balances("After refused payment", &mut [&mut bank, &mut wallet_a, &mut wallet_b]);

    let mut block = Block::new_block(&chain.next_pre_block_hash())?;
    let tx = wallet_b.send_coins(wallet_a.get_address(), 20)?;
    block.try_add_transaction(tx, &ledger)?;
    chain.append_with_signal(block, &mining_signal(timeout))?;
    print_balances("Wallet B pays Wallet A 20", &mut [&mut bank, &mut wallet_a, &mut wallet_b]);

    println!(
        "Chain of {} blocks, valid: {}, unspent outputs: {}",
        chain.len(),
        chain.is_valid(),
        ledger.count()
    );
    Ok(chain)
}

fn print_balances(title: &str, wallets: &mut [&mut Wallet]) {
    println!("-----------------------------------------");
    println!("{title}");
    for wallet in wallets.iter_mut() {
        let balance = wallet.get_balance();
        println!("  {}: {balance}", wallet.get_address());
    }
}
