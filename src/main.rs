fn main() -> anyhow::Result<()> {
    qrchat_lib::run()
}
