use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

struct Env {
    home: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        let env = Self {
            home: tempfile::tempdir().unwrap(),
        };
        env.cmd()
            .args(["init", "--data-dir"])
            .arg(env.data_dir())
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized taxmate"));
        env
    }

    fn data_dir(&self) -> PathBuf {
        self.home.path().join("data")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taxmate").unwrap();
        cmd.env("HOME", self.home.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn signup(&self, email: &str) {
        self.cmd()
            .args([
                "signup",
                "--name",
                "Jo Bloggs",
                "--email",
                email,
                "--phone",
                "07123456789",
                "--occupation",
                "Plumber",
                "--ni",
                "QQ123456C",
                "--dob",
                "1985-04-12",
                "--method",
                "cash",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Welcome, Jo Bloggs!"));
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn portal_commands_require_sign_in() {
    let env = Env::new();
    env.cmd()
        .args(["summary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn signup_rejects_unknown_email_provider() {
    let env = Env::new();
    env.cmd()
        .args([
            "signup", "--name", "Jo", "--email", "jo@example.com", "--phone", "07123456789",
            "--occupation", "Plumber", "--ni", "QQ123456C", "--dob", "1985-04-12", "--method", "cash",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("known provider"));
}

#[test]
fn signup_login_and_dashboard() {
    let env = Env::new();
    env.signup("jo@gmail.com");

    env.cmd()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("jo@gmail.com"));

    env.cmd()
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("*******6C"))
        .stdout(predicate::str::contains("QQ123456C").not());

    env.cmd().arg("logout").assert().success();
    env.cmd().arg("whoami").assert().failure();
    env.cmd()
        .args(["login", "jo@gmail.com"])
        .assert()
        .success();
    env.cmd()
        .args(["login", "nobody@gmail.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No account registered"));
}

#[test]
fn manual_entries_feed_tax_summary_and_export() {
    let env = Env::new();
    env.signup("jo@gmail.com");

    env.cmd()
        .args(["txn", "add", "1000", "--type", "income", "--date", "2025-07-01", "--description", "Stripe payout"])
        .assert()
        .success();
    env.cmd()
        .args(["txn", "add", "250.50", "--date", "2025-07-09", "--description", "Uber"])
        .assert()
        .success();

    env.cmd()
        .arg("tax")
        .assert()
        .success()
        .stdout(predicate::str::contains("July 2025"))
        .stdout(predicate::str::contains("£149.90"));

    let out = env.home.path().join("tax.csv");
    env.cmd()
        .args(["export", "tax", "--output"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(
        read(&out),
        "Month,Income,Expenses,Net,Estimated Tax\nJuly 2025,1000.00,250.50,749.50,149.90"
    );

    env.cmd()
        .args(["export", "transactions", "--month", "2025-07"])
        .assert()
        .success();
    let register = read(&env.data_dir().join("exports").join("July 2025-summary.csv"));
    assert!(register.starts_with("Date,Type,Amount,Category,Description\n"));
    assert!(register.ends_with("2025-07-09,expense,250.5,Transport,Uber"));
}

#[test]
fn fully_accepted_upload_is_not_imported_twice() {
    let env = Env::new();
    env.signup("jo@gmail.com");
    let csv = env.write(
        "bank.csv",
        "date,amount,vendor,category\n\
         2025-08-01,12.99,Tesco,\n\
         2025-08-02,abc,Shell,Fuel\n\
         2025-08-03,,Missing,\n\
         2025-08-04,40,Trainline,Travel\n",
    );

    env.cmd()
        .arg("upload")
        .arg(&csv)
        .arg("--accept-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid amount"))
        .stdout(predicate::str::contains("2 of 3 rows accepted"));

    env.cmd()
        .args(["txn", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncategorized"))
        .stdout(predicate::str::contains("Travel"));

    let clean = env.write("clean.csv", "date,amount,vendor,category\n2025-08-05,3.50,Costa,Coffee\n");
    env.cmd()
        .arg("upload")
        .arg(&clean)
        .arg("--accept-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 rows accepted"));
    env.cmd()
        .arg("upload")
        .arg(&clean)
        .arg("--accept-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("already been uploaded"));
}

#[test]
fn upload_resumes_after_partial_accept() {
    let env = Env::new();
    env.signup("jo@gmail.com");
    let csv = env.write(
        "partial.csv",
        "date,amount,vendor,category\n\
         2025-08-01,12.99,Tesco,\n\
         2025-08-02,abc,Shell,Fuel\n",
    );

    env.cmd()
        .arg("upload")
        .arg(&csv)
        .arg("--accept-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 2 rows accepted"));

    env.cmd()
        .arg("upload")
        .arg(&csv)
        .arg("--accept-all")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming: 1 of 2 rows"))
        .stdout(predicate::str::contains("Row 2 has an invalid amount"))
        .stdout(predicate::str::contains("already been uploaded").not());

    env.cmd()
        .args(["txn", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tesco"))
        .stdout(predicate::str::contains("Shell").not());
}

#[test]
fn non_csv_upload_is_stored_only() {
    let env = Env::new();
    env.signup("jo@gmail.com");
    let pdf = env.write("receipt.pdf", "%PDF-1.4");
    env.cmd()
        .arg("upload")
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored for future processing"));
}

#[test]
fn filing_lifecycle() {
    let env = Env::new();
    env.signup("jo@gmail.com");

    env.cmd()
        .args(["filing", "new", "--year", "1999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 2000 and 2100"));

    env.cmd()
        .args(["filing", "new", "--year", "2025", "--month", "3", "--income", "500", "--expenses", "120"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Draft filing 1 created for March 2025"));

    env.cmd()
        .args(["filing", "submit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("submitted"));
    env.cmd()
        .args(["filing", "submit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already submitted"));

    env.cmd()
        .args(["filing", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("March"));
}

#[test]
fn delete_requires_confirmation_word() {
    let env = Env::new();
    env.signup("jo@gmail.com");
    env.cmd()
        .args(["txn", "add", "9", "--date", "2025-08-01"])
        .assert()
        .success();

    // Without a terminal the prompt yields nothing, so the delete is cancelled.
    env.cmd()
        .args(["txn", "delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Delete cancelled"));

    env.cmd()
        .args(["txn", "delete", "1", "--yes"])
        .assert()
        .success();
    env.cmd()
        .args(["txn", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions yet"));
}

#[test]
fn quick_prompts_answer_without_network() {
    let env = Env::new();
    env.cmd()
        .args(["ask", "--prompts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("How do I start a new filing?"));
    env.cmd()
        .args(["ask", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Monthly Summary"));
}
