use blitz::error::AppResult;

fn main() -> AppResult<()> {
    blitz::entry::run()
}
