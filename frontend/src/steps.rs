use shared::guided::{GuidedFlow, Step, StepText};

pub fn introduction() -> GuidedFlow {
    GuidedFlow::new(vec![
        Step::tap(
            "origin",
            "もともと、ぼくたちは完全な意識でした。\n\nやりたいことは何でもできて、\n無限の可能性として、無条件の愛に満ちていた。",
        ),
        Step::tap(
            "curiosity",
            "その意識が、「地球」という惑星を見つけたんです。\n\n「できない」という概念は、\n自分にはまったくないものでした。",
        ),
        Step::tap(
            "separation",
            "そこで、ぼくたちは自分の意識を\n何等分にも「分離」させて、\n自らの波動を下げていきました。",
        ),
        Step::tap(
            "projector",
            "自分が「映写機」。\nその映写機に入れた周波数が、\n真っ白な現実のスクリーンに映し出されていく。",
        ),
    ])
    .with_completion_message(
        "ストーリーを読んでいただきありがとうございます。\n\nホームに戻って、ワークを始めてみましょう ✨",
    )
}

pub fn letting_go() -> GuidedFlow {
    GuidedFlow::new(vec![
        Step::tap(
            "arrive",
            "映写機の場所に立ちます。\n深呼吸をして、からだの感覚に意識を向けましょう。",
        ),
        Step::text(
            "limit",
            "limit",
            "いま手放したい「制限」を、ひとことで書いてみてください。",
        )
        .with_placeholder("例：どうせ自分にはできない"),
        Step::select(
            "where",
            "where",
            StepText::template(|answers| {
                let limit = answers.get("limit").map(String::as_str).unwrap_or("その制限");
                format!("「{limit}」を感じるとき、からだのどこに重さがありますか？")
            }),
            &["胸", "お腹", "喉", "頭"],
        ),
        Step::tap(
            "release",
            StepText::template(|answers| {
                let place = answers.get("where").map(String::as_str).unwrap_or("からだ");
                format!("{place}にある重さを、映写機からそっと取り出すイメージをします。\n\n取り出せたら、タップしてください。")
            }),
        ),
    ])
}
